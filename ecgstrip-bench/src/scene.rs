/// Scene composition: synthetic 12-lead strips with known geometry.
use ecgstrip::digitize::grid::{calibration_units, min_positive_gap, GridParams};
use ecgstrip::digitize::image::PixelGrid;
use ecgstrip::digitize::separator::{cut_lines, SeparatorParams, WhiteBand, SEPARATOR_COUNT};
use ecgstrip::digitize::segment::ZONE_COUNT;
use ecgstrip::error::DigitizeError;
use serde::{Deserialize, Serialize};

use crate::distortion::{self, Canvas, Distortion, Rng};

pub const PAPER: [u8; 3] = [255, 255, 255];
pub const GRID_RED: [u8; 3] = [230, 30, 30];
pub const TRACE_BLUE: [u8; 3] = [40, 40, 140];
/// Dark print (legends, labels) that must not count as trace ink.
pub const PRINT_BLACK: [u8; 3] = [20, 20, 20];

/// What a correct digitization of the scene looks like.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripTruth {
    /// Blank columns left of the first trace column.
    pub margin: u32,
    /// Whitespace bands between zones, absent when the strip has none.
    pub bands: Option<[WhiteBand; SEPARATOR_COUNT]>,
    /// Cut lines a default digitizer should place, in margin-trimmed rows.
    pub separators: Option<[u32; SEPARATOR_COUNT]>,
    /// Expected coarse calibration unit, assuming the ruling is found.
    pub base_unit: u32,
    /// Whether any trace ink was drawn.
    pub has_ink: bool,
}

/// A complete scene: image + ground truth.
#[derive(Debug, Clone)]
pub struct Scene {
    pub image: PixelGrid,
    pub truth: StripTruth,
}

/// Paper fill for the scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Background {
    Solid([u8; 3]),
    /// Vertical blend from `top` to `bottom`.
    Gradient { top: [u8; 3], bottom: [u8; 3] },
}

/// Builder for synthetic strips.
///
/// The strip is eight noise zones of `zone_height` rows separated by seven
/// `band_height` row whitespace bands, preceded by `margin` blank columns.
pub struct SceneBuilder {
    content_width: u32,
    zone_height: u32,
    band_height: u32,
    margin: u32,
    background: Background,
    grid_pitch: Option<u32>,
    grid_color: [u8; 3],
    trace_density: f64,
    pulse: bool,
    seed: u64,
    distortions: Vec<Distortion>,
    /// Page height when there is no zone layout.
    page_height: Option<u32>,
}

impl SceneBuilder {
    pub fn new(content_width: u32, zone_height: u32, band_height: u32) -> Self {
        Self {
            content_width,
            zone_height,
            band_height,
            margin: 0,
            background: Background::Solid(PAPER),
            grid_pitch: None,
            grid_color: GRID_RED,
            trace_density: 0.03,
            pulse: true,
            seed: 1,
            distortions: Vec::new(),
            page_height: None,
        }
    }

    /// A page with no traces at all.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            trace_density: 0.0,
            pulse: false,
            page_height: Some(height),
            ..Self::new(width, 0, 0)
        }
    }

    pub fn margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    pub fn background(mut self, bg: Background) -> Self {
        self.background = bg;
        self
    }

    /// Rule the paper with red lines every `pitch` pixels.
    pub fn grid(mut self, pitch: u32) -> Self {
        self.grid_pitch = Some(pitch.max(2));
        self
    }

    pub fn grid_color(mut self, color: [u8; 3]) -> Self {
        self.grid_color = color;
        self
    }

    /// Probability that a zone pixel starts a 2×2 trace dot.
    pub fn trace_density(mut self, density: f64) -> Self {
        self.trace_density = density;
        self
    }

    /// Draw the two-column calibration pulse at the start of every zone.
    pub fn pulse(mut self, pulse: bool) -> Self {
        self.pulse = pulse;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn distort(mut self, distortion: Distortion) -> Self {
        self.distortions.push(distortion);
        self
    }

    pub fn width(&self) -> u32 {
        self.margin + self.content_width
    }

    pub fn height(&self) -> u32 {
        self.page_height.unwrap_or(
            ZONE_COUNT as u32 * self.zone_height + SEPARATOR_COUNT as u32 * self.band_height,
        )
    }

    /// Rows `[start, end)` of zone `k`.
    fn zone_rows(&self, k: u32) -> (u32, u32) {
        let start = k * (self.zone_height + self.band_height);
        (start, start + self.zone_height)
    }

    /// Compose the strip and derive its ground truth.
    pub fn build(self) -> Result<Scene, DigitizeError> {
        let (width, height) = (self.width(), self.height());
        let mut canvas = fill_background(width, height, &self.background);

        let ruled = self
            .grid_pitch
            .map(|pitch| draw_grid(&mut canvas, pitch, self.grid_color));

        let mut rng = Rng::new(self.seed);
        let mut has_ink = false;
        for k in 0..ZONE_COUNT as u32 {
            let (y0, y1) = self.zone_rows(k);
            if y1 == y0 {
                continue;
            }
            if self.pulse {
                canvas.fill_rect(self.margin, y0, 2, y1 - y0, TRACE_BLUE);
                has_ink = true;
            }
            if self.trace_density > 0.0 {
                has_ink |= draw_trace_dots(
                    &mut canvas,
                    &mut rng,
                    self.margin,
                    y0,
                    y1,
                    self.trace_density,
                );
            }
        }

        distortion::apply(&mut canvas, &self.distortions);

        let bands = (self.band_height > 0 && self.zone_height > 0).then(|| {
            std::array::from_fn(|k| WhiteBand {
                start: self.zone_rows(k as u32).1,
                height: self.band_height,
            })
        });
        let separators = bands
            .as_ref()
            .map(|b| cut_lines(b, &SeparatorParams::default()).0);

        let (base_unit, _) = match ruled {
            Some((rows, cols)) => calibration_units(
                min_positive_gap(&rows),
                min_positive_gap(&cols),
                GridParams::default().fine_divisions,
            ),
            None => (1, 0),
        };

        let truth = StripTruth {
            margin: if has_ink { self.margin } else { 0 },
            bands,
            separators,
            base_unit,
            has_ink,
        };
        let image = PixelGrid::from_rgb(width, height, canvas.rgb)?;
        Ok(Scene { image, truth })
    }
}

/// Fill a canvas with the given background.
fn fill_background(width: u32, height: u32, bg: &Background) -> Canvas {
    match bg {
        Background::Solid(c) => Canvas::new(width, height, *c),
        Background::Gradient { top, bottom } => {
            let mut canvas = Canvas::new(width, height, *top);
            for y in 0..height {
                let t = if height > 1 {
                    y as f64 / (height - 1) as f64
                } else {
                    0.0
                };
                let c: [u8; 3] = std::array::from_fn(|i| {
                    (top[i] as f64 * (1.0 - t) + bottom[i] as f64 * t).round() as u8
                });
                canvas.fill_rect(0, y, width, 1, c);
            }
            canvas
        }
    }
}

/// Rule full-width rows and full-height columns at `pitch / 2 + k * pitch`.
/// Returns the ruled row and column coordinates.
fn draw_grid(canvas: &mut Canvas, pitch: u32, color: [u8; 3]) -> (Vec<u32>, Vec<u32>) {
    let offset = pitch / 2;
    let rows: Vec<u32> = (offset..canvas.height).step_by(pitch as usize).collect();
    let cols: Vec<u32> = (offset..canvas.width).step_by(pitch as usize).collect();
    let (w, h) = (canvas.width, canvas.height);
    for &y in &rows {
        canvas.fill_rect(0, y, w, 1, color);
    }
    for &x in &cols {
        canvas.fill_rect(x, 0, 1, h, color);
    }
    (rows, cols)
}

/// Scatter 2×2 trace dots over zone rows `[y0, y1)` right of `margin`.
/// Dots are clipped to the zone so bands stay clean.
fn draw_trace_dots(
    canvas: &mut Canvas,
    rng: &mut Rng,
    margin: u32,
    y0: u32,
    y1: u32,
    density: f64,
) -> bool {
    let mut drawn = false;
    for y in y0.saturating_sub(1)..y1 {
        for x in margin..canvas.width {
            if rng.next_f64() >= density {
                continue;
            }
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (px, py) = (x + dx, y + dy);
                if (y0..y1).contains(&py) {
                    canvas.set(px, py, TRACE_BLUE);
                    drawn = true;
                }
            }
        }
    }
    drawn
}
