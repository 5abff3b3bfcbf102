mod frame;
mod render_png;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ecgstrip::digitize::digitizer::{Digitization, Digitizer, DigitizerConfig};
use ecgstrip::digitize::grid::Calibration;
use ecgstrip::digitize::image::PixelGrid;
use ecgstrip::lead::Lead;

/// ECG strip digitizer: split 12-lead strip images into packed lead bitmaps
#[derive(Parser)]
#[command(name = "ecgstrip-digitize", version)]
struct Args {
    /// Input files (PNG or JPEG, or raw frames with --raw)
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Inputs are raw upload frames instead of image files
    #[arg(long)]
    raw: bool,

    /// TOML file with digitizer settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Probe limit for the separator search
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Fraction of panel width trimmed from each side
    #[arg(long)]
    trim_ratio: Option<f64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: Format,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Write each lead as <dir>/<lead>.png
    #[arg(long)]
    lead_dir: Option<PathBuf>,

    /// Write the segmentation overlay as <dir>/<input stem>.overlay.png
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Only log warnings
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log per-stage details
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One JSON object per input
    Json,
    /// Big-endian response frames, concatenated
    Binary,
}

#[derive(Serialize)]
struct OutputResult {
    file: String,
    image_width: u32,
    image_height: u32,
    margin: u32,
    fallback: bool,
    separators: [u32; 7],
    midline: u32,
    calibration: Calibration,
    leads: Vec<OutputLead>,
}

#[derive(Serialize)]
struct OutputLead {
    lead: Lead,
    calibration: u64,
    width: u32,
    height: u32,
    n: usize,
    data: Vec<u32>,
}

fn init_tracing(args: &Args) {
    let default = if args.quiet {
        "warn"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<DigitizerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            DigitizerConfig::from_toml_str(&text)
                .with_context(|| format!("invalid config: {}", path.display()))?
        }
        None => DigitizerConfig::default(),
    };
    if let Some(n) = args.max_iterations {
        config.separator.max_iterations = n;
    }
    if let Some(ratio) = args.trim_ratio {
        config.panel_trim_ratio = ratio;
    }
    config.validate()?;
    Ok(config)
}

fn load_image(path: &Path, raw: bool) -> Result<PixelGrid> {
    if raw {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read raw frame: {}", path.display()))?;
        return frame::decode_raw_frame(&bytes)
            .with_context(|| format!("failed to decode raw frame: {}", path.display()));
    }

    let img = image::open(path)
        .with_context(|| format!("failed to open image: {}", path.display()))?
        .into_rgb8();

    let width = img.width();
    let height = img.height();
    PixelGrid::from_rgb(width, height, img.into_raw())
        .with_context(|| format!("unusable image: {}", path.display()))
}

fn to_output(file: &Path, grid: &PixelGrid, result: &Digitization) -> OutputResult {
    let leads = result
        .panels
        .iter()
        .map(|p| OutputLead {
            lead: p.lead,
            calibration: p.calibration_unit,
            width: p.width,
            height: p.height,
            n: p.word_count(),
            data: p.words.clone(),
        })
        .collect();

    OutputResult {
        file: file.display().to_string(),
        image_width: grid.width(),
        image_height: grid.height(),
        margin: result.overlay.margin,
        fallback: result.fallback_used(),
        separators: result.overlay.lines,
        midline: result.overlay.midline,
        calibration: result.calibration.clone(),
        leads,
    }
}

fn overlay_path(dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "strip".to_string());
    dir.join(format!("{stem}.overlay.png"))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let digitizer = Digitizer::new(load_config(&args)?);
    let mut stdout = std::io::stdout().lock();

    for path in &args.images {
        let grid = load_image(path, args.raw)?;
        info!(
            file = %path.display(),
            width = grid.width(),
            height = grid.height(),
            "digitizing"
        );

        let result = digitizer
            .digitize(&grid)
            .with_context(|| format!("failed to digitize {}", path.display()))?;
        info!(
            fallback = result.fallback_used(),
            base_unit = result.calibration.base_unit,
            panel_width = result.panels[0].width,
            panel_height = result.panels[0].height,
            "digitized"
        );

        if let Some(dir) = &args.lead_dir {
            let mut sink = render_png::PngLeadSink::create(dir)?;
            result.deliver(&mut sink)?;
            info!(count = sink.written().len(), dir = %dir.display(), "lead bitmaps written");
        }

        if let Some(dir) = &args.overlay_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating overlay directory {}", dir.display()))?;
            let out = overlay_path(dir, path);
            render_png::write_overlay(&grid, &result.overlay, &out)?;
            info!(file = %out.display(), "overlay written");
        }

        match args.format {
            Format::Json => {
                let output = to_output(path, &grid, &result);
                let json = if args.pretty {
                    serde_json::to_string_pretty(&output)?
                } else {
                    serde_json::to_string(&output)?
                };
                writeln!(stdout, "{json}")?;
            }
            Format::Binary => {
                stdout.write_all(&frame::encode_response(&result.panels)?)?;
            }
        }
    }

    stdout.flush()?;
    Ok(())
}
