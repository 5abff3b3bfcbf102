/// Pre-defined strip scenarios for digitization quality evaluation.
use ecgstrip::error::DigitizeError;

use crate::distortion::Distortion;
use crate::scene::{Background, Scene, SceneBuilder, PRINT_BLACK, TRACE_BLUE};

/// A category of test scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Baseline,
    Bands,
    Grid,
    Margin,
    Noise,
    Print,
    Fallback,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Baseline,
            Category::Bands,
            Category::Grid,
            Category::Margin,
            Category::Noise,
            Category::Print,
            Category::Fallback,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Category::Baseline => "baseline",
            Category::Bands => "bands",
            Category::Grid => "grid",
            Category::Margin => "margin",
            Category::Noise => "noise",
            Category::Print => "print",
            Category::Fallback => "fallback",
        }
    }

    pub fn from_name(name: &str) -> Option<Category> {
        Category::all().iter().find(|c| c.name() == name).copied()
    }
}

type BuildFn = Box<dyn Fn() -> Result<Scene, DigitizeError> + Send + Sync>;

/// A test scenario that generates a strip and bounds the acceptable error.
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub category: Category,
    /// Largest acceptable cut-line error in rows.
    pub max_separator_error: u32,
    build_fn: BuildFn,
}

impl Scenario {
    pub fn build(&self) -> Result<Scene, DigitizeError> {
        (self.build_fn)()
    }
}

/// Build the full catalog of test scenarios.
pub fn all_scenarios() -> Vec<Scenario> {
    let mut scenarios = Vec::new();
    scenarios.extend(baseline_scenarios());
    scenarios.extend(band_scenarios());
    scenarios.extend(grid_scenarios());
    scenarios.extend(margin_scenarios());
    scenarios.extend(noise_scenarios());
    scenarios.extend(print_scenarios());
    scenarios.extend(fallback_scenarios());
    scenarios
}

/// Filter scenarios by category.
pub fn scenarios_for_category(category: Category) -> Vec<Scenario> {
    all_scenarios()
        .into_iter()
        .filter(|s| s.category == category)
        .collect()
}

fn baseline_scenarios() -> Vec<Scenario> {
    [400, 800, 1200]
        .iter()
        .map(|&width| Scenario {
            name: format!("baseline-{width}w"),
            description: format!("{width}px strip, 30px zones, 40px bands"),
            category: Category::Baseline,
            max_separator_error: 0,
            build_fn: Box::new(move || SceneBuilder::new(width, 30, 40).build()),
        })
        .collect()
}

fn band_scenarios() -> Vec<Scenario> {
    let mut scenarios: Vec<Scenario> = [10, 20, 60]
        .iter()
        .map(|&band| Scenario {
            name: format!("bands-{band}px"),
            description: format!("40px zones separated by {band}px bands"),
            category: Category::Bands,
            max_separator_error: 0,
            build_fn: Box::new(move || {
                SceneBuilder::new(400, 40, band)
                    .seed(band as u64)
                    .build()
            }),
        })
        .collect();

    // Bands thinner than the initial minimum height need the relaxing loop.
    scenarios.push(Scenario {
        name: "bands-narrow-4px".into(),
        description: "80px zones separated by 4px bands".into(),
        category: Category::Bands,
        max_separator_error: 0,
        build_fn: Box::new(|| SceneBuilder::new(400, 80, 4).build()),
    });
    scenarios
}

fn grid_scenarios() -> Vec<Scenario> {
    let mut scenarios: Vec<Scenario> = [13, 15, 16]
        .iter()
        .map(|&pitch| Scenario {
            name: format!("grid-pitch{pitch}"),
            description: format!("Red ruling every {pitch}px"),
            category: Category::Grid,
            max_separator_error: 0,
            build_fn: Box::new(move || SceneBuilder::new(600, 30, 40).grid(pitch).build()),
        })
        .collect();

    scenarios.push(Scenario {
        name: "grid-faint".into(),
        description: "Ruling too faint for the initial red threshold".into(),
        category: Category::Grid,
        max_separator_error: 0,
        build_fn: Box::new(|| {
            SceneBuilder::new(600, 30, 40)
                .grid(15)
                .grid_color([185, 40, 40])
                .build()
        }),
    });
    scenarios.push(Scenario {
        name: "grid-faded-print".into(),
        description: "Whole strip faded 30% toward white".into(),
        category: Category::Grid,
        max_separator_error: 0,
        build_fn: Box::new(|| {
            SceneBuilder::new(600, 30, 40)
                .grid(15)
                .distort(Distortion::Fade { factor: 0.3 })
                .build()
        }),
    });
    scenarios
}

fn margin_scenarios() -> Vec<Scenario> {
    [20, 60, 150]
        .iter()
        .map(|&margin| Scenario {
            name: format!("margin-{margin}px"),
            description: format!("{margin}px blank margin before the traces"),
            category: Category::Margin,
            max_separator_error: 0,
            build_fn: Box::new(move || SceneBuilder::new(500, 30, 40).margin(margin).build()),
        })
        .collect()
}

fn noise_scenarios() -> Vec<Scenario> {
    [5, 20]
        .iter()
        .map(|&basis_points| Scenario {
            name: format!("noise-specks{basis_points}"),
            description: format!("Trace-coloured specks at {basis_points}bp density"),
            category: Category::Noise,
            max_separator_error: 1,
            build_fn: Box::new(move || {
                SceneBuilder::new(600, 30, 40)
                    .distort(Distortion::Specks {
                        density: basis_points as f64 / 10_000.0,
                        color: TRACE_BLUE,
                        seed: basis_points as u64,
                    })
                    .build()
            }),
        })
        .collect()
}

fn print_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "print-legend-blocks".into(),
            description: "Black legend blocks inside the whitespace bands".into(),
            category: Category::Print,
            max_separator_error: 0,
            build_fn: Box::new(|| {
                SceneBuilder::new(600, 30, 40)
                    .distort(Distortion::Paint {
                        rect: [50, 35, 120, 30],
                        color: PRINT_BLACK,
                    })
                    .distort(Distortion::Paint {
                        rect: [300, 455, 200, 30],
                        color: PRINT_BLACK,
                    })
                    .build()
            }),
        },
        Scenario {
            name: "print-tinted-paper".into(),
            description: "Paper tinted from white to pink down the strip".into(),
            category: Category::Print,
            max_separator_error: 0,
            build_fn: Box::new(|| {
                SceneBuilder::new(600, 30, 40)
                    .background(Background::Gradient {
                        top: [255, 255, 255],
                        bottom: [250, 225, 215],
                    })
                    .grid(15)
                    .build()
            }),
        },
    ]
}

fn fallback_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "fallback-blank-800x600".into(),
            description: "Blank page, equal zones expected".into(),
            category: Category::Fallback,
            max_separator_error: 0,
            build_fn: Box::new(|| SceneBuilder::blank(800, 600).build()),
        },
        Scenario {
            name: "fallback-blank-ruled".into(),
            description: "Ruled page without traces".into(),
            category: Category::Fallback,
            max_separator_error: 0,
            build_fn: Box::new(|| SceneBuilder::blank(800, 600).grid(16).build()),
        },
    ]
}
