#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, instrument, warn};

use crate::error::DigitizeError;
use crate::lead::Lead;

use super::binarize::{binarize, BinarizeParams};
use super::denoise::remove_isolated;
use super::grid::{calibrate, Calibration, GridParams};
use super::image::PixelGrid;
use super::margin::{trim_left_margin, MARGIN_MIN_INK};
use super::pack::{pack, PackedPanel};
use super::segment::{midline, segment, SegmentLayout};
use super::separator::{find_separators, SeparatorParams, SEPARATOR_COUNT};

/// Digitizer configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DigitizerConfig {
    pub binarize: BinarizeParams,
    /// Ink pixels a column needs to end the left margin.
    pub margin_min_ink: u32,
    pub separator: SeparatorParams,
    pub grid: GridParams,
    /// Fraction of panel width trimmed from each side.
    pub panel_trim_ratio: f64,
}

impl Default for DigitizerConfig {
    fn default() -> Self {
        Self {
            binarize: BinarizeParams::default(),
            margin_min_ink: MARGIN_MIN_INK,
            separator: SeparatorParams::default(),
            grid: GridParams::default(),
            panel_trim_ratio: 0.05,
        }
    }
}

impl DigitizerConfig {
    /// Parse a (possibly partial) TOML document; missing keys keep defaults.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(s: &str) -> Result<Self, DigitizeError> {
        let config: Self = toml::from_str(s).map_err(|e| DigitizeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter is in range.
    pub fn validate(&self) -> Result<(), DigitizeError> {
        if !(0.0..0.5).contains(&self.panel_trim_ratio) {
            return Err(DigitizeError::Config(format!(
                "panel_trim_ratio must be in [0, 0.5), got {}",
                self.panel_trim_ratio
            )));
        }
        self.separator.validate()?;
        self.grid.validate()
    }
}

/// Geometry an external renderer needs to draw the segmentation overlay on
/// the margin-trimmed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OverlayGeometry {
    /// Columns removed from the left of the input.
    pub margin: u32,
    pub width: u32,
    pub height: u32,
    /// Horizontal cut lines, detected or equal-partition.
    pub lines: [u32; SEPARATOR_COUNT],
    pub fallback: bool,
    /// Vertical split between limb and chest leads.
    pub midline: u32,
}

/// Receives packed panels in lead order.
pub trait LeadSink {
    type Error;

    fn write_lead(&mut self, lead: Lead, panel: &PackedPanel) -> Result<(), Self::Error>;
}

impl LeadSink for Vec<PackedPanel> {
    type Error = std::convert::Infallible;

    fn write_lead(&mut self, _lead: Lead, panel: &PackedPanel) -> Result<(), Self::Error> {
        self.push(panel.clone());
        Ok(())
    }
}

/// Result of digitizing one strip.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Digitization {
    /// Twelve packed panels in `Lead::ALL` order.
    pub panels: Vec<PackedPanel>,
    pub calibration: Calibration,
    pub layout: SegmentLayout,
    pub separator_iterations: u32,
    pub overlay: OverlayGeometry,
}

impl Digitization {
    /// Whether separator detection failed and equal zones were used.
    pub fn fallback_used(&self) -> bool {
        self.layout.is_fallback()
    }

    pub fn panel(&self, lead: Lead) -> &PackedPanel {
        &self.panels[lead.index()]
    }

    /// Hand every panel to `sink`, in lead order.
    pub fn deliver<S: LeadSink>(&self, sink: &mut S) -> Result<(), S::Error> {
        for panel in &self.panels {
            sink.write_lead(panel.lead, panel)?;
        }
        Ok(())
    }
}

/// ECG strip digitizer.
pub struct Digitizer {
    pub config: DigitizerConfig,
}

impl Default for Digitizer {
    fn default() -> Self {
        Self::new(DigitizerConfig::default())
    }
}

impl Digitizer {
    pub fn new(config: DigitizerConfig) -> Self {
        Self { config }
    }

    /// Split a strip image into twelve packed lead panels.
    #[instrument(skip_all, fields(width = grid.width(), height = grid.height()))]
    pub fn digitize(&self, grid: &PixelGrid) -> Result<Digitization, DigitizeError> {
        let cfg = &self.config;
        cfg.validate()?;

        // Stage 1: Binarize and denoise
        let mask = binarize(grid, &cfg.binarize);
        let mask = remove_isolated(&mask);

        // Stage 2: Margin
        let (mask, margin) = trim_left_margin(&mask, cfg.margin_min_ink);
        debug!(margin, ink = mask.count_ink(), "mask prepared");

        // Stage 3: Calibration (raw pixels) and separators (mask)
        #[cfg(feature = "parallel")]
        let (calibration, search) = rayon::join(
            || calibrate(grid, &cfg.grid),
            || find_separators(&mask, &cfg.separator),
        );

        #[cfg(not(feature = "parallel"))]
        let (calibration, search) = (
            calibrate(grid, &cfg.grid),
            find_separators(&mask, &cfg.separator),
        );

        let layout = SegmentLayout::from_separators(search.separators());
        if layout.is_fallback() {
            warn!(
                iterations = search.iterations(),
                "separator detection failed, using equal zones"
            );
        }

        // Stage 4: Segmentation
        let panels = segment(
            &mask,
            &layout,
            calibration.fine_unit,
            cfg.panel_trim_ratio,
        );
        if panels.iter().all(|p| p.width() == 0 || p.height() == 0) {
            return Err(DigitizeError::EmptyResult {
                width: mask.width,
                height: mask.height,
            });
        }

        // Stage 5: Packing
        #[cfg(feature = "parallel")]
        let packed: Vec<PackedPanel> = panels.par_iter().map(pack).collect();

        #[cfg(not(feature = "parallel"))]
        let packed: Vec<PackedPanel> = panels.iter().map(pack).collect();

        if let Some(first) = packed.first() {
            debug!(
                panel_width = first.width,
                panel_height = first.height,
                words = first.word_count(),
                "panels packed"
            );
        }

        let overlay = OverlayGeometry {
            margin,
            width: mask.width,
            height: mask.height,
            lines: layout.cut_lines(mask.height),
            fallback: layout.is_fallback(),
            midline: midline(mask.width),
        };

        Ok(Digitization {
            panels: packed,
            calibration,
            layout,
            separator_iterations: search.iterations(),
            overlay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digitize::pack::unpack;
    use crate::lead::LEAD_COUNT;

    const PAPER: [u8; 3] = [255, 255, 255];
    const TRACE: [u8; 3] = [60, 60, 160];

    /// Eight 30-row noise zones separated by 40-row white bands.
    fn banded_strip(width: u32) -> PixelGrid {
        PixelGrid::from_fn(width, 8 * 30 + 7 * 40, |x, y| {
            let in_zone = y % 70 < 30;
            if in_zone && (x * 7 + y * 3) % 5 == 0 {
                TRACE
            } else {
                PAPER
            }
        })
        .unwrap()
    }

    #[test]
    fn digitizer_default_config() {
        let config = DigitizerConfig::default();
        assert_eq!(config.margin_min_ink, 10);
        assert!((config.panel_trim_ratio - 0.05).abs() < 1e-12);
        assert_eq!(config.grid.red_threshold, 200);
        assert_eq!(config.separator.max_iterations, 50);
    }

    #[test]
    fn blank_page_uses_fallback() {
        let grid = PixelGrid::from_fn(800, 600, |_, _| PAPER).unwrap();
        let result = Digitizer::default().digitize(&grid).unwrap();

        assert!(result.fallback_used());
        assert_eq!(result.panels.len(), LEAD_COUNT);
        assert_eq!(result.calibration.base_unit, 1);
        assert!(result.calibration.fine_unit > 0);
        for (panel, lead) in result.panels.iter().zip(Lead::ALL) {
            assert_eq!(panel.lead, lead);
            assert_eq!((panel.width, panel.height), (360, 75));
            assert_eq!(panel.calibration_unit, result.calibration.fine_unit);
            assert!(panel.words.iter().all(|&w| w == 0));
        }
        assert_eq!(result.overlay.lines, [75, 150, 225, 300, 375, 450, 525]);
        assert_eq!(result.overlay.midline, 400);
        assert_eq!(result.overlay.margin, 0);
    }

    #[test]
    fn banded_strip_finds_separators() {
        let grid = banded_strip(200);
        let result = Digitizer::default().digitize(&grid).unwrap();

        assert_eq!(
            result.layout,
            SegmentLayout::Separators {
                lines: [58, 120, 190, 260, 330, 400, 462]
            }
        );
        assert!(!result.overlay.fallback);
        for panel in &result.panels {
            assert_eq!((panel.width, panel.height), (90, 62));
            assert!(unpack(panel).count_ink() > 0);
        }
    }

    #[test]
    fn tiny_image_is_empty_result() {
        let grid = PixelGrid::from_fn(4, 4, |_, _| PAPER).unwrap();
        let err = Digitizer::default().digitize(&grid).unwrap_err();
        assert!(matches!(err, DigitizeError::EmptyResult { .. }));
    }

    #[test]
    fn deliver_hands_over_panels_in_order() {
        let grid = PixelGrid::from_fn(160, 160, |_, _| PAPER).unwrap();
        let result = Digitizer::default().digitize(&grid).unwrap();
        let mut sink: Vec<PackedPanel> = Vec::new();
        result.deliver(&mut sink).unwrap();
        let leads: Vec<Lead> = sink.iter().map(|p| p.lead).collect();
        assert_eq!(leads, Lead::ALL.to_vec());
        assert_eq!(result.panel(Lead::V4), &sink[Lead::V4.index()]);
    }

    #[test]
    #[cfg(feature = "serde")]
    fn partial_toml_keeps_defaults() {
        let config = DigitizerConfig::from_toml_str(
            "panel_trim_ratio = 0.1\n[separator]\nmax_iterations = 12\n",
        )
        .unwrap();
        assert!((config.panel_trim_ratio - 0.1).abs() < 1e-12);
        assert_eq!(config.separator.max_iterations, 12);
        assert_eq!(config.separator.first_cut_percent, 70);
        assert_eq!(config.grid, GridParams::default());

        assert!(DigitizerConfig::from_toml_str("panel_trim_ratio = \"x\"").is_err());
    }

    #[test]
    #[cfg(feature = "serde")]
    fn out_of_range_toml_is_rejected() {
        for doc in [
            "[separator]\nlast_cut_percent = 250\n",
            "[separator]\nrow_threshold_ratio = nan\n",
            "[separator]\nrelax_row = -1.0\n",
            "panel_trim_ratio = 0.7\n",
            "[grid]\nline_coverage = inf\n",
        ] {
            let err = DigitizerConfig::from_toml_str(doc).unwrap_err();
            assert!(matches!(err, DigitizeError::Config(_)), "{doc}");
        }
    }

    #[test]
    fn invalid_config_is_an_error_not_a_panic() {
        let mut config = DigitizerConfig::default();
        config.separator.last_cut_percent = 250;
        let err = Digitizer::new(config).digitize(&banded_strip(200)).unwrap_err();
        assert!(matches!(err, DigitizeError::Config(_)));

        let mut config = DigitizerConfig::default();
        config.separator.row_threshold_ratio = f64::NAN;
        let grid = PixelGrid::from_fn(50, 50, |_, _| PAPER).unwrap();
        let err = Digitizer::new(config).digitize(&grid).unwrap_err();
        assert!(matches!(err, DigitizeError::Config(_)));
    }

    #[test]
    fn full_cut_percents_stay_inside_the_mask() {
        let mut config = DigitizerConfig::default();
        config.separator.first_cut_percent = 100;
        config.separator.inner_cut_percent = 100;
        config.separator.last_cut_percent = 100;
        let result = Digitizer::new(config).digitize(&banded_strip(200)).unwrap();
        assert!(!result.fallback_used());
        assert_eq!(result.overlay.lines, [70, 140, 210, 280, 350, 420, 490]);
        assert!(result.overlay.lines.iter().all(|&l| l <= result.overlay.height));
    }
}
