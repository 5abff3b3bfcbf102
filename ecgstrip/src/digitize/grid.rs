use std::ops::RangeInclusive;

use tracing::debug;

use crate::error::DigitizeError;

use super::convergence::{converge, AdaptiveSearch, Miss};
use super::image::PixelGrid;

/// Fixed-point scale of the calibration unit.
pub const CALIBRATION_SCALE: u64 = 1_000_000;

/// Ruled-line detection parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GridParams {
    /// Starting minimum red value for a grid pixel.
    pub red_threshold: u8,
    /// Maximum green value for a grid pixel.
    pub green_max: u8,
    /// Maximum blue value for a grid pixel.
    pub blue_max: u8,
    /// Fraction of a row (or column) that must be grid pixels for a line.
    pub line_coverage: f64,
    /// Acceptable number of horizontal lines.
    pub min_lines: usize,
    pub max_lines: usize,
    /// Red threshold change per adjustment.
    pub step: u8,
    pub max_iterations: u32,
    /// Fine divisions per coarse ruled square.
    pub fine_divisions: u32,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            red_threshold: 200,
            green_max: 100,
            blue_max: 100,
            line_coverage: 0.8,
            min_lines: 30,
            max_lines: 40,
            step: 5,
            max_iterations: 20,
            fine_divisions: 5,
        }
    }
}

impl GridParams {
    pub fn validate(&self) -> Result<(), DigitizeError> {
        if !(0.0..=1.0).contains(&self.line_coverage) {
            return Err(DigitizeError::Config(format!(
                "grid.line_coverage must be in [0, 1], got {}",
                self.line_coverage
            )));
        }
        if self.min_lines > self.max_lines {
            return Err(DigitizeError::Config(format!(
                "grid.min_lines ({}) exceeds grid.max_lines ({})",
                self.min_lines, self.max_lines
            )));
        }
        if self.fine_divisions == 0 {
            return Err(DigitizeError::Config(
                "grid.fine_divisions must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    fn target(&self) -> RangeInclusive<usize> {
        self.min_lines..=self.max_lines
    }

    #[inline]
    fn is_grid_pixel(&self, [r, g, b]: [u8; 3], red_threshold: u8) -> bool {
        r >= red_threshold && g <= self.green_max && b <= self.blue_max
    }
}

/// Ruled lines found under one red threshold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridLines {
    /// y-coordinates of horizontal lines, ascending.
    pub horizontal: Vec<u32>,
    /// x-coordinates of vertical lines, ascending.
    pub vertical: Vec<u32>,
}

/// Pixel-to-grid scale derived from ruled line spacing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Calibration {
    /// Coarse line spacing in pixels, at least 1.
    pub base_unit: u32,
    /// `base_unit * CALIBRATION_SCALE / fine_divisions`.
    pub fine_unit: u64,
    /// Red threshold the search settled on.
    pub red_threshold: u8,
    pub horizontal_lines: usize,
    pub vertical_lines: usize,
    pub min_horizontal_gap: Option<u32>,
    pub min_vertical_gap: Option<u32>,
    pub iterations: u32,
    /// Whether the horizontal line count reached the target range.
    pub converged: bool,
}

impl Calibration {
    /// True when no usable line spacing was found and the unit was clamped.
    pub fn degenerate(&self) -> bool {
        self.min_horizontal_gap.is_none() && self.min_vertical_gap.is_none()
    }
}

/// Smallest positive difference between consecutive sorted coordinates.
pub fn min_positive_gap(lines: &[u32]) -> Option<u32> {
    lines
        .windows(2)
        .map(|w| w[1].saturating_sub(w[0]))
        .filter(|&g| g > 0)
        .min()
}

/// Base and fine calibration units from the minimal gap of each axis.
///
/// A missing gap counts as zero; the base unit never drops below 1.
pub fn calibration_units(
    min_horizontal_gap: Option<u32>,
    min_vertical_gap: Option<u32>,
    fine_divisions: u32,
) -> (u32, u64) {
    let base = min_horizontal_gap
        .unwrap_or(0)
        .max(min_vertical_gap.unwrap_or(0))
        .max(1);
    let fine = base as u64 * CALIBRATION_SCALE / fine_divisions.max(1) as u64;
    (base, fine)
}

/// Collect full-width rows and full-height columns of grid-coloured pixels.
pub fn find_grid_lines(grid: &PixelGrid, params: &GridParams, red_threshold: u8) -> GridLines {
    let w = grid.width();
    let h = grid.height();
    let mut col_counts = vec![0u32; w as usize];
    let mut horizontal = Vec::new();

    for y in 0..h {
        let mut row_count = 0u32;
        for (x, px) in grid.row(y).enumerate() {
            if params.is_grid_pixel(px, red_threshold) {
                row_count += 1;
                col_counts[x] += 1;
            }
        }
        if row_count as f64 >= params.line_coverage * w as f64 {
            horizontal.push(y);
        }
    }

    let vertical = col_counts
        .iter()
        .enumerate()
        .filter(|(_, &c)| c as f64 >= params.line_coverage * h as f64)
        .map(|(x, _)| x as u32)
        .collect();

    GridLines {
        horizontal,
        vertical,
    }
}

struct RuledLineSearch<'a> {
    grid: &'a PixelGrid,
    params: &'a GridParams,
}

impl AdaptiveSearch for RuledLineSearch<'_> {
    type Params = u8;
    type Found = GridLines;

    fn probe(&self, red_threshold: &u8) -> GridLines {
        find_grid_lines(self.grid, self.params, *red_threshold)
    }

    fn count(&self, found: &GridLines) -> usize {
        found.horizontal.len()
    }

    fn adjust(&self, red_threshold: &u8, miss: Miss) -> Option<u8> {
        let next = match miss {
            Miss::TooFew => red_threshold.saturating_sub(self.params.step),
            Miss::TooMany => red_threshold.saturating_add(self.params.step),
        };
        (next != *red_threshold).then_some(next)
    }
}

/// Detect ruled reference lines in the raw image and derive the calibration
/// unit, adapting the red threshold until the horizontal line count is in
/// range.
pub fn calibrate(grid: &PixelGrid, params: &GridParams) -> Calibration {
    let search = RuledLineSearch { grid, params };
    let outcome = converge(
        &search,
        params.red_threshold,
        params.target(),
        params.max_iterations,
    );

    let lines = &outcome.found;
    let min_horizontal_gap = min_positive_gap(&lines.horizontal);
    let min_vertical_gap = min_positive_gap(&lines.vertical);
    let (base_unit, fine_unit) =
        calibration_units(min_horizontal_gap, min_vertical_gap, params.fine_divisions);

    let calibration = Calibration {
        base_unit,
        fine_unit,
        red_threshold: outcome.params,
        horizontal_lines: lines.horizontal.len(),
        vertical_lines: lines.vertical.len(),
        min_horizontal_gap,
        min_vertical_gap,
        iterations: outcome.iterations,
        converged: outcome.converged,
    };

    debug!(
        red_threshold = calibration.red_threshold,
        horizontal = calibration.horizontal_lines,
        vertical = calibration.vertical_lines,
        base_unit,
        iterations = calibration.iterations,
        converged = calibration.converged,
        "grid calibration"
    );
    if calibration.degenerate() {
        debug!("no ruled line spacing found, calibration unit clamped to 1");
    }
    calibration
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 3] = [230, 40, 40];
    const PAPER: [u8; 3] = [255, 255, 255];

    /// White page with red rules every `pitch` pixels on both axes.
    fn ruled(w: u32, h: u32, pitch: u32, colour: [u8; 3]) -> PixelGrid {
        PixelGrid::from_fn(w, h, |x, y| {
            if x % pitch == 0 || y % pitch == 0 {
                colour
            } else {
                PAPER
            }
        })
        .unwrap()
    }

    #[test]
    fn calibration_arithmetic_is_exact() {
        assert_eq!(calibration_units(Some(7), Some(9), 5), (9, 1_800_000));
        assert_eq!(calibration_units(Some(12), None, 5), (12, 2_400_000));
        assert_eq!(calibration_units(None, None, 5), (1, 200_000));
        assert_eq!(calibration_units(Some(3), Some(3), 5), (3, 600_000));
    }

    #[test]
    fn min_gap_ignores_duplicates() {
        assert_eq!(min_positive_gap(&[4, 4, 10, 13, 30]), Some(3));
        assert_eq!(min_positive_gap(&[8]), None);
        assert_eq!(min_positive_gap(&[]), None);
    }

    #[test]
    fn finds_lines_on_ruled_page() {
        let grid = ruled(100, 100, 10, RED);
        let lines = find_grid_lines(&grid, &GridParams::default(), 200);
        assert_eq!(lines.horizontal, (0..100).step_by(10).collect::<Vec<_>>());
        assert_eq!(lines.vertical.len(), 10);
    }

    #[test]
    fn partial_rows_are_not_lines() {
        // Red runs over 70% of the row only.
        let grid = PixelGrid::from_fn(100, 20, |x, y| {
            if y == 5 && x < 70 {
                RED
            } else {
                PAPER
            }
        })
        .unwrap();
        let lines = find_grid_lines(&grid, &GridParams::default(), 200);
        assert!(lines.horizontal.is_empty());
    }

    #[test]
    fn calibrates_ruled_page_in_range() {
        // 35 horizontal lines at pitch 8.
        let grid = ruled(280, 280, 8, RED);
        let cal = calibrate(&grid, &GridParams::default());
        assert!(cal.converged);
        assert_eq!(cal.horizontal_lines, 35);
        assert_eq!(cal.base_unit, 8);
        assert_eq!(cal.fine_unit, 1_600_000);
        assert_eq!(cal.iterations, 1);
    }

    #[test]
    fn lowers_red_threshold_for_faint_rules() {
        // Red channel 185: invisible at 200, found after three steps down.
        let grid = ruled(280, 280, 8, [185, 40, 40]);
        let cal = calibrate(&grid, &GridParams::default());
        assert!(cal.converged);
        assert_eq!(cal.red_threshold, 185);
        assert_eq!(cal.iterations, 4);
        assert_eq!(cal.base_unit, 8);
    }

    #[test]
    fn blank_page_clamps_to_one() {
        let grid = PixelGrid::from_fn(64, 48, |_, _| PAPER).unwrap();
        let cal = calibrate(&grid, &GridParams::default());
        assert!(!cal.converged);
        assert!(cal.degenerate());
        assert_eq!(cal.base_unit, 1);
        assert_eq!(cal.fine_unit, 200_000);
        assert_eq!(cal.iterations, 20);
    }

    #[test]
    fn validate_rejects_bad_params() {
        assert!(GridParams::default().validate().is_ok());
        for params in [
            GridParams {
                line_coverage: f64::NAN,
                ..GridParams::default()
            },
            GridParams {
                line_coverage: 1.5,
                ..GridParams::default()
            },
            GridParams {
                min_lines: 41,
                ..GridParams::default()
            },
            GridParams {
                fine_divisions: 0,
                ..GridParams::default()
            },
        ] {
            assert!(params.validate().is_err(), "{params:?}");
        }
    }
}
