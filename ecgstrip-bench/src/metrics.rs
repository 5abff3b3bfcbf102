/// Digitization quality metrics: separator accuracy, panel uniformity, calibration.
use ecgstrip::digitize::digitizer::Digitization;
use ecgstrip::digitize::separator::SEPARATOR_COUNT;
use serde::{Deserialize, Serialize};

use crate::scene::StripTruth;

/// Result of evaluating one digitization against ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneResult {
    /// Whether the truth has no whitespace bands.
    pub fallback_expected: bool,
    pub fallback_used: bool,
    /// Absolute row error per cut line, when both sides have separators.
    pub separator_errors: Option<[u32; SEPARATOR_COUNT]>,
    /// Largest entry of `separator_errors`, 0 when there are none.
    pub max_separator_error: u32,
    /// Absolute error of the trimmed left margin.
    pub margin_error: u32,
    pub expected_base_unit: u32,
    pub base_unit: u32,
    pub fine_unit: u64,
    /// All twelve panels share one non-zero size.
    pub panels_uniform: bool,
    pub panel_size: [u32; 2],
    /// Number of panels with at least one ink sample.
    pub inked_panels: usize,
    /// Digitization time in microseconds.
    pub digitize_time_us: u64,
}

impl SceneResult {
    /// Layout matches the truth and every cut line is within `threshold` rows.
    pub fn layout_ok(&self, threshold: u32) -> bool {
        self.fallback_used == self.fallback_expected && self.max_separator_error <= threshold
    }

    pub fn calibration_ok(&self) -> bool {
        self.base_unit == self.expected_base_unit
    }

    /// Every panel carries ink exactly when the scene has ink.
    pub fn ink_ok(&self, has_ink: bool) -> bool {
        if has_ink {
            self.inked_panels == ecgstrip::lead::LEAD_COUNT
        } else {
            self.inked_panels == 0
        }
    }
}

/// Evaluate a digitization against the scene's ground truth.
pub fn evaluate(truth: &StripTruth, result: &Digitization, digitize_time_us: u64) -> SceneResult {
    let found = (!result.fallback_used()).then_some(result.overlay.lines);
    let separator_errors = match (truth.separators, found) {
        (Some(expected), Some(found)) => {
            Some(std::array::from_fn(|i| expected[i].abs_diff(found[i])))
        }
        _ => None,
    };
    let max_separator_error = separator_errors
        .map(|e| e.into_iter().max().unwrap_or(0))
        .unwrap_or(0);

    let first = &result.panels[0];
    let panels_uniform = result.panels.len() == ecgstrip::lead::LEAD_COUNT
        && first.width > 0
        && first.height > 0
        && result
            .panels
            .iter()
            .all(|p| p.width == first.width && p.height == first.height);
    let inked_panels = result
        .panels
        .iter()
        .filter(|p| p.words.iter().any(|&w| w != 0))
        .count();

    SceneResult {
        fallback_expected: truth.separators.is_none(),
        fallback_used: result.fallback_used(),
        separator_errors,
        max_separator_error,
        margin_error: truth.margin.abs_diff(result.overlay.margin),
        expected_base_unit: truth.base_unit,
        base_unit: result.calibration.base_unit,
        fine_unit: result.calibration.fine_unit,
        panels_uniform,
        panel_size: [first.width, first.height],
        inked_panels,
        digitize_time_us,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneBuilder;
    use ecgstrip::digitize::digitizer::Digitizer;

    #[test]
    fn clean_strip_scores_zero_error() {
        let scene = SceneBuilder::new(400, 30, 40).margin(10).build().unwrap();
        let result = Digitizer::default().digitize(&scene.image).unwrap();
        let m = evaluate(&scene.truth, &result, 0);

        assert!(!m.fallback_expected);
        assert!(!m.fallback_used);
        assert_eq!(m.max_separator_error, 0);
        assert_eq!(m.margin_error, 0);
        assert!(m.layout_ok(0));
        assert!(m.panels_uniform);
        assert!(m.ink_ok(true));
    }

    #[test]
    fn shifted_truth_reports_row_error() {
        let scene = SceneBuilder::new(400, 30, 40).build().unwrap();
        let result = Digitizer::default().digitize(&scene.image).unwrap();

        let mut truth = scene.truth.clone();
        if let Some(lines) = truth.separators.as_mut() {
            lines[3] += 4;
        }
        let m = evaluate(&truth, &result, 0);
        assert_eq!(m.max_separator_error, 4);
        assert!(!m.layout_ok(3));
        assert!(m.layout_ok(4));
    }

    #[test]
    fn blank_page_expects_fallback() {
        let scene = SceneBuilder::blank(400, 320).build().unwrap();
        let result = Digitizer::default().digitize(&scene.image).unwrap();
        let m = evaluate(&scene.truth, &result, 0);

        assert!(m.fallback_expected && m.fallback_used);
        assert!(m.separator_errors.is_none());
        assert!(m.layout_ok(0));
        assert!(m.calibration_ok());
        assert!(m.ink_ok(false));
    }
}
