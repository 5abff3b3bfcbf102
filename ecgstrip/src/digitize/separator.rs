use smallvec::SmallVec;
use tracing::debug;

use crate::error::DigitizeError;

use super::convergence::{converge, AdaptiveSearch, Miss};
use super::image::InkMask;

/// Number of whitespace bands separating the strip's eight zones.
pub const SEPARATOR_COUNT: usize = 7;

/// Whitespace band search parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SeparatorParams {
    /// Initial sparse-row threshold as a fraction of mask width.
    pub row_threshold_ratio: f64,
    /// Initial minimum band height as a fraction of mask height.
    pub min_block_ratio: f64,
    /// Multipliers applied when too many bands are found.
    pub tighten_block: f64,
    pub tighten_row: f64,
    /// Multipliers applied when too few bands are found.
    pub relax_block: f64,
    pub relax_row: f64,
    pub max_iterations: u32,
    /// Cut position inside the first, last and interior bands, in percent of
    /// band height from its top.
    pub first_cut_percent: u32,
    pub last_cut_percent: u32,
    pub inner_cut_percent: u32,
}

impl Default for SeparatorParams {
    fn default() -> Self {
        Self {
            row_threshold_ratio: 0.01,
            min_block_ratio: 0.01,
            tighten_block: 1.1,
            tighten_row: 0.9,
            relax_block: 0.9,
            relax_row: 1.1,
            max_iterations: 50,
            first_cut_percent: 70,
            last_cut_percent: 30,
            inner_cut_percent: 50,
        }
    }
}

impl SeparatorParams {
    /// Reject ratios and multipliers that are not finite and positive, and
    /// cut percents above 100.
    pub fn validate(&self) -> Result<(), DigitizeError> {
        let factors = [
            ("row_threshold_ratio", self.row_threshold_ratio),
            ("min_block_ratio", self.min_block_ratio),
            ("tighten_block", self.tighten_block),
            ("tighten_row", self.tighten_row),
            ("relax_block", self.relax_block),
            ("relax_row", self.relax_row),
        ];
        for (name, value) in factors {
            if !value.is_finite() || value <= 0.0 {
                return Err(DigitizeError::Config(format!(
                    "separator.{name} must be finite and > 0, got {value}"
                )));
            }
        }
        let percents = [
            ("first_cut_percent", self.first_cut_percent),
            ("last_cut_percent", self.last_cut_percent),
            ("inner_cut_percent", self.inner_cut_percent),
        ];
        for (name, value) in percents {
            if value > 100 {
                return Err(DigitizeError::Config(format!(
                    "separator.{name} must be at most 100, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// A run of consecutive sparse rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WhiteBand {
    pub start: u32,
    pub height: u32,
}

impl WhiteBand {
    /// Row `percent`% of the way into the band, rounded down.
    pub fn cut_at(&self, percent: u32) -> u32 {
        self.start + (self.height as u64 * percent as u64 / 100) as u32
    }
}

/// Seven ascending cut lines splitting the mask into eight zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Separators(pub [u32; SEPARATOR_COUNT]);

impl Separators {
    pub fn lines(&self) -> &[u32; SEPARATOR_COUNT] {
        &self.0
    }
}

/// Outcome of the separator search.
#[derive(Debug, Clone, PartialEq)]
pub enum SeparatorSearch {
    Found {
        separators: Separators,
        bands: [WhiteBand; SEPARATOR_COUNT],
        iterations: u32,
    },
    /// The search exhausted its bounds without isolating exactly seven bands.
    Failed { bands_found: usize, iterations: u32 },
}

impl SeparatorSearch {
    pub fn separators(&self) -> Option<Separators> {
        match self {
            SeparatorSearch::Found { separators, .. } => Some(*separators),
            SeparatorSearch::Failed { .. } => None,
        }
    }

    pub fn iterations(&self) -> u32 {
        match self {
            SeparatorSearch::Found { iterations, .. } | SeparatorSearch::Failed { iterations, .. } => {
                *iterations
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BandThresholds {
    row_threshold: f64,
    min_block_height: f64,
}

type Bands = SmallVec<[WhiteBand; 8]>;

/// Collect runs of rows whose ink count is below `row_threshold` and whose
/// length is at least `min_block_height`.
fn white_bands(row_counts: &[u32], row_threshold: f64, min_block_height: f64) -> Bands {
    let mut bands = Bands::new();
    let h = row_counts.len();
    let mut y = 0;
    let sparse = |count: u32| (count as f64) < row_threshold;
    while y < h {
        if !sparse(row_counts[y]) {
            y += 1;
            continue;
        }
        let start = y;
        y += 1;
        while y < h && sparse(row_counts[y]) {
            y += 1;
        }
        let height = y - start;
        if height as f64 >= min_block_height {
            bands.push(WhiteBand {
                start: start as u32,
                height: height as u32,
            });
        }
    }
    bands
}

struct BandSearch<'a> {
    row_counts: Vec<u32>,
    width: u32,
    height: u32,
    params: &'a SeparatorParams,
}

impl AdaptiveSearch for BandSearch<'_> {
    type Params = BandThresholds;
    type Found = Bands;

    fn probe(&self, t: &BandThresholds) -> Bands {
        white_bands(&self.row_counts, t.row_threshold, t.min_block_height)
    }

    fn count(&self, found: &Bands) -> usize {
        found.len()
    }

    fn adjust(&self, t: &BandThresholds, miss: Miss) -> Option<BandThresholds> {
        match miss {
            Miss::TooMany => {
                let next = BandThresholds {
                    row_threshold: t.row_threshold * self.params.tighten_row,
                    min_block_height: t.min_block_height * self.params.tighten_block,
                };
                (next.min_block_height <= self.height as f64).then_some(next)
            }
            Miss::TooFew => {
                let next = BandThresholds {
                    row_threshold: t.row_threshold * self.params.relax_row,
                    min_block_height: t.min_block_height * self.params.relax_block,
                };
                (next.row_threshold <= self.width as f64).then_some(next)
            }
        }
    }
}

/// Cut line inside each band: biased down in the first band and up in the
/// last so header and footer legends fall outside the lead zones.
pub fn cut_lines(bands: &[WhiteBand; SEPARATOR_COUNT], params: &SeparatorParams) -> Separators {
    let mut lines = [0u32; SEPARATOR_COUNT];
    for (i, band) in bands.iter().enumerate() {
        let percent = match i {
            0 => params.first_cut_percent,
            i if i == SEPARATOR_COUNT - 1 => params.last_cut_percent,
            _ => params.inner_cut_percent,
        };
        lines[i] = band.cut_at(percent);
    }
    lines.sort_unstable();
    Separators(lines)
}

/// Search the mask for exactly seven whitespace bands.
pub fn find_separators(mask: &InkMask, params: &SeparatorParams) -> SeparatorSearch {
    let search = BandSearch {
        row_counts: mask.row_counts(),
        width: mask.width,
        height: mask.height,
        params,
    };
    let initial = BandThresholds {
        row_threshold: mask.width as f64 * params.row_threshold_ratio,
        min_block_height: mask.height as f64 * params.min_block_ratio,
    };
    let outcome = converge(
        &search,
        initial,
        SEPARATOR_COUNT..=SEPARATOR_COUNT,
        params.max_iterations,
    );

    let iterations = outcome.iterations;
    if !outcome.converged {
        debug!(
            bands_found = outcome.found.len(),
            iterations, "separator search exhausted"
        );
        return SeparatorSearch::Failed {
            bands_found: outcome.found.len(),
            iterations,
        };
    }

    let mut bands = [WhiteBand {
        start: 0,
        height: 0,
    }; SEPARATOR_COUNT];
    bands.copy_from_slice(&outcome.found);
    let separators = cut_lines(&bands, params);
    debug!(
        lines = ?separators.lines(),
        iterations,
        row_threshold = outcome.params.row_threshold,
        min_block_height = outcome.params.min_block_height,
        "separators found"
    );
    SeparatorSearch::Found {
        separators,
        bands,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Eight `zone` row tall noise zones separated by `band` row blank bands.
    fn banded_mask(width: u32, zone: u32, band: u32) -> InkMask {
        let height = 8 * zone + 7 * band;
        let mut m = InkMask::new(width, height);
        for y in 0..height {
            let in_zone = y % (zone + band) < zone;
            if !in_zone {
                continue;
            }
            for x in 0..width {
                if (x * 7 + y * 3) % 5 == 0 {
                    m.set(x, y, true);
                }
            }
        }
        m
    }

    #[test]
    fn white_bands_respect_thresholds() {
        let counts = [5, 0, 0, 0, 5, 0, 5, 1, 1, 0];
        let bands = white_bands(&counts, 2.0, 2.0);
        assert_eq!(
            bands.as_slice(),
            &[
                WhiteBand { start: 1, height: 3 },
                WhiteBand { start: 7, height: 3 },
            ]
        );
        assert_eq!(white_bands(&counts, 2.0, 4.0).len(), 0);
        assert_eq!(white_bands(&counts, 1.0, 1.0).len(), 3);
    }

    #[test]
    fn finds_seven_bands_with_biased_cuts() {
        let m = banded_mask(200, 30, 40);
        let result = find_separators(&m, &SeparatorParams::default());
        let SeparatorSearch::Found {
            separators, bands, ..
        } = result
        else {
            panic!("expected seven bands, got {result:?}");
        };
        for (i, band) in bands.iter().enumerate() {
            assert_eq!(band.start, 30 + i as u32 * 70);
            assert_eq!(band.height, 40);
        }
        assert_eq!(
            separators.lines(),
            &[58, 120, 190, 260, 330, 400, 462]
        );
        assert!(separators.lines().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn extra_thin_gaps_are_tightened_away() {
        // Seven tall bands plus two single blank rows inside zones.
        let mut m = banded_mask(200, 30, 40);
        for x in 0..200 {
            m.set(x, 10, false);
            m.set(x, 80, false);
        }
        // One-row gaps stay under the default minimum band height.
        let result = find_separators(&m, &SeparatorParams::default());
        assert!(result.separators().is_some());

        // With a tiny minimum they count until the search tightens.
        let params = SeparatorParams {
            min_block_ratio: 0.0015,
            ..SeparatorParams::default()
        };
        let result = find_separators(&m, &params);
        assert!(result.iterations() > 1);
        assert_eq!(
            result.separators().map(|s| s.0),
            Some([58, 120, 190, 260, 330, 400, 462])
        );
    }

    #[test]
    fn blank_mask_fails() {
        let m = InkMask::new(100, 80);
        let result = find_separators(&m, &SeparatorParams::default());
        assert!(matches!(
            result,
            SeparatorSearch::Failed { bands_found: 1, .. }
        ));
        assert!(result.separators().is_none());
    }

    #[test]
    fn dense_mask_fails_within_bound() {
        let m = InkMask::from_buf(50, 50, vec![true; 2500]);
        let params = SeparatorParams::default();
        let result = find_separators(&m, &params);
        assert!(result.separators().is_none());
        assert!(result.iterations() <= params.max_iterations);
    }

    #[test]
    fn cut_at_rounds_down() {
        let band = WhiteBand { start: 10, height: 15 };
        assert_eq!(band.cut_at(70), 20);
        assert_eq!(band.cut_at(30), 14);
        assert_eq!(band.cut_at(50), 17);
    }

    #[test]
    fn cut_at_tall_band_does_not_wrap() {
        let band = WhiteBand {
            start: 0,
            height: 50_000_000,
        };
        assert_eq!(band.cut_at(100), 50_000_000);
        assert_eq!(band.cut_at(70), 35_000_000);
    }

    #[test]
    fn nan_threshold_finds_nothing_and_terminates() {
        let counts = [0, 0, 3, 0];
        assert!(white_bands(&counts, f64::NAN, 1.0).is_empty());
        assert!(white_bands(&counts, 1.0, f64::NAN).is_empty());
    }

    #[test]
    fn validate_rejects_bad_params() {
        assert!(SeparatorParams::default().validate().is_ok());

        let bad = [
            SeparatorParams {
                last_cut_percent: 250,
                ..SeparatorParams::default()
            },
            SeparatorParams {
                row_threshold_ratio: f64::NAN,
                ..SeparatorParams::default()
            },
            SeparatorParams {
                relax_row: 0.0,
                ..SeparatorParams::default()
            },
            SeparatorParams {
                tighten_block: f64::INFINITY,
                ..SeparatorParams::default()
            },
        ];
        for params in bad {
            let err = params.validate().unwrap_err();
            assert!(matches!(err, DigitizeError::Config(_)), "{params:?}");
        }

        let edge = SeparatorParams {
            first_cut_percent: 100,
            last_cut_percent: 0,
            ..SeparatorParams::default()
        };
        assert!(edge.validate().is_ok());
    }
}
