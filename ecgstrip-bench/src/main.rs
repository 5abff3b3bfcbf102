use std::time::Instant;

use clap::{Parser, Subcommand};
use ecgstrip::digitize::digitizer::Digitizer;
use rayon::prelude::*;

use ecgstrip_bench::catalog::{self, Category, Scenario};
use ecgstrip_bench::distortion::Distortion;
use ecgstrip_bench::metrics;
use ecgstrip_bench::report::{self, FullReport, ScenarioReport};
use ecgstrip_bench::scene::{SceneBuilder, TRACE_BLUE};

#[derive(Parser)]
#[command(name = "ecgstrip-bench", about = "ECG strip digitization test harness")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run test scenarios and output results.
    Run {
        /// Filter by category name.
        #[arg(long)]
        category: Option<String>,
        /// Filter by scenario name pattern (substring match).
        #[arg(long)]
        scenario: Option<String>,
        /// Output format: terminal, json.
        #[arg(long, default_value = "terminal")]
        format: String,
        /// Override the cut-line error threshold in rows.
        #[arg(long)]
        threshold: Option<u32>,
        /// Only show failures.
        #[arg(long)]
        quiet: bool,
    },
    /// List available scenarios.
    List {
        /// Filter by category.
        #[arg(long)]
        category: Option<String>,
    },
    /// Run all scenarios and exit with code 1 on any failure.
    Regression {
        /// Filter by category.
        #[arg(long)]
        category: Option<String>,
    },
    /// Generate and digitize a single strip with custom parameters.
    Explore {
        /// Trace area width in pixels.
        #[arg(long, default_value_t = 800)]
        width: u32,
        /// Zone height in pixels.
        #[arg(long, default_value_t = 30)]
        zone: u32,
        /// Whitespace band height in pixels.
        #[arg(long, default_value_t = 40)]
        band: u32,
        /// Blank columns before the traces.
        #[arg(long, default_value_t = 0)]
        margin: u32,
        /// Red ruling pitch in pixels (0 = no ruling).
        #[arg(long, default_value_t = 0)]
        grid: u32,
        /// Trace dot density.
        #[arg(long, default_value_t = 0.03)]
        density: f64,
        /// Speck density.
        #[arg(long, default_value_t = 0.0)]
        specks: f64,
        /// Fade toward white (0-1).
        #[arg(long, default_value_t = 0.0)]
        fade: f64,
        /// Random seed.
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Output format: terminal, json.
        #[arg(long, default_value = "terminal")]
        format: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            category,
            scenario,
            format,
            threshold,
            quiet,
        } => cmd_run(category, scenario, &format, threshold, quiet),
        Command::List { category } => cmd_list(category),
        Command::Regression { category } => cmd_regression(category),
        Command::Explore {
            width,
            zone,
            band,
            margin,
            grid,
            density,
            specks,
            fade,
            seed,
            format,
        } => cmd_explore(
            width, zone, band, margin, grid, density, specks, fade, seed, &format,
        ),
    }
}

fn filter_scenarios(category: Option<String>, scenario: Option<String>) -> Vec<Scenario> {
    let mut scenarios = if let Some(cat_name) = &category {
        let Some(cat) = Category::from_name(cat_name) else {
            eprintln!("unknown category: {cat_name}");
            std::process::exit(2);
        };
        catalog::scenarios_for_category(cat)
    } else {
        catalog::all_scenarios()
    };

    if let Some(pattern) = &scenario {
        scenarios.retain(|s| s.name.contains(pattern.as_str()));
    }

    scenarios
}

fn run_scenario(scenario: &Scenario, threshold: u32) -> ScenarioReport {
    let category = scenario.category.name();
    let scene = match scenario.build() {
        Ok(scene) => scene,
        Err(e) => return report::error_report(&scenario.name, category, &e),
    };

    let digitizer = Digitizer::default();
    let start = Instant::now();
    let result = digitizer.digitize(&scene.image);
    let elapsed = start.elapsed();

    match result {
        Ok(result) => {
            let m = metrics::evaluate(&scene.truth, &result, elapsed.as_micros() as u64);
            report::scenario_report(&scenario.name, category, &m, scene.truth.has_ink, threshold)
        }
        Err(e) => report::error_report(&scenario.name, category, &e),
    }
}

fn run_all(scenarios: &[Scenario], threshold_override: Option<u32>) -> Vec<ScenarioReport> {
    scenarios
        .par_iter()
        .map(|s| run_scenario(s, threshold_override.unwrap_or(s.max_separator_error)))
        .collect()
}

fn cmd_run(
    category: Option<String>,
    scenario: Option<String>,
    format: &str,
    threshold_override: Option<u32>,
    quiet: bool,
) {
    let scenarios = filter_scenarios(category, scenario);

    let mut reports = run_all(&scenarios, threshold_override);
    if quiet {
        reports.retain(|r| !r.passed);
    }

    let full = FullReport::from_scenarios(reports);

    match format {
        "json" => println!("{}", report::to_json(&full)),
        _ => report::print_terminal(&full),
    }
}

fn cmd_list(category: Option<String>) {
    let scenarios = filter_scenarios(category, None);
    println!("{:<28} {:<10} Description", "Name", "Category");
    println!("{}", "-".repeat(80));
    for s in &scenarios {
        println!("{:<28} {:<10} {}", s.name, s.category.name(), s.description);
    }
    println!("\nTotal: {} scenarios", scenarios.len());
}

fn cmd_regression(category: Option<String>) {
    let scenarios = filter_scenarios(category, None);
    let full = FullReport::from_scenarios(run_all(&scenarios, None));
    report::print_terminal(&full);

    if !full.all_passed() {
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_explore(
    width: u32,
    zone: u32,
    band: u32,
    margin: u32,
    grid: u32,
    density: f64,
    specks: f64,
    fade: f64,
    seed: u64,
    format: &str,
) {
    let mut builder = SceneBuilder::new(width, zone, band)
        .margin(margin)
        .trace_density(density)
        .seed(seed);
    if grid > 0 {
        builder = builder.grid(grid);
    }
    if specks > 0.0 {
        builder = builder.distort(Distortion::Specks {
            density: specks,
            color: TRACE_BLUE,
            seed,
        });
    }
    if fade > 0.0 {
        builder = builder.distort(Distortion::Fade { factor: fade });
    }

    let scene = match builder.build() {
        Ok(scene) => scene,
        Err(e) => {
            eprintln!("cannot build strip: {e}");
            std::process::exit(2);
        }
    };

    let start = Instant::now();
    let result = match Digitizer::default().digitize(&scene.image) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("digitization failed: {e}");
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    let m = metrics::evaluate(&scene.truth, &result, elapsed.as_micros() as u64);
    let r = report::scenario_report("explore", "explore", &m, scene.truth.has_ink, u32::MAX);

    match format {
        "json" => println!("{}", report::to_json(&FullReport::from_scenarios(vec![r]))),
        _ => {
            println!(
                "Strip: {}x{}, zone={}, band={}, margin={}, grid={}",
                scene.image.width(),
                scene.image.height(),
                zone,
                band,
                margin,
                grid
            );
            if specks > 0.0 || fade > 0.0 {
                println!("Distortions: specks={}, fade={}", specks, fade);
            }
            println!();
            println!(
                "Layout: {}",
                if m.fallback_used { "equal zones" } else { "separators" }
            );
            println!("Cut lines: {:?}", result.overlay.lines);
            if let Some(expected) = scene.truth.separators {
                println!("Expected:  {:?}", expected);
            }
            println!("Separator iterations: {}", result.separator_iterations);
            println!(
                "Margin: {} (expected {})",
                result.overlay.margin, scene.truth.margin
            );
            println!(
                "Calibration: base={} fine={} red_threshold={} ({} iterations)",
                result.calibration.base_unit,
                result.calibration.fine_unit,
                result.calibration.red_threshold,
                result.calibration.iterations
            );
            println!(
                "Panels: {}x{}, {} with ink",
                m.panel_size[0], m.panel_size[1], m.inked_panels
            );
            println!("Digitize time: {:.1} ms", elapsed.as_secs_f64() * 1000.0);
        }
    }
}
