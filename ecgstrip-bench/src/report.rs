/// Report generation: terminal, JSON output for scenario results.
use crate::metrics::SceneResult;

/// Summary of a single scenario run.
#[derive(Debug, serde::Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub category: String,
    pub passed: bool,
    pub fallback: bool,
    pub max_separator_error: u32,
    pub margin_error: u32,
    pub base_unit: u32,
    pub expected_base_unit: u32,
    pub panel_size: [u32; 2],
    pub inked_panels: usize,
    pub digitize_time_us: u64,
    pub threshold: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full report across all scenarios.
#[derive(Debug, serde::Serialize)]
pub struct FullReport {
    pub scenarios: Vec<ScenarioReport>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl FullReport {
    pub fn from_scenarios(scenarios: Vec<ScenarioReport>) -> Self {
        let total = scenarios.len();
        let passed = scenarios.iter().filter(|s| s.passed).count();
        let failed = total - passed;
        Self {
            scenarios,
            total,
            passed,
            failed,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Print a terminal table summarizing results.
pub fn print_terminal(report: &FullReport) {
    println!(
        "{:<28} {:>5} {:>6} {:>6} {:>9} {:>9} {:>5} {:>6}",
        "Scenario", "Mode", "SepErr", "MrgErr", "Unit", "Panel", "Ink", "Status"
    );
    println!("{}", "-".repeat(84));

    for s in &report.scenarios {
        let status = if s.passed { "PASS" } else { "FAIL" };
        let mode = if s.fallback { "equal" } else { "bands" };
        println!(
            "{:<28} {:>5} {:>6} {:>6} {:>9} {:>9} {:>5} {:>6}",
            truncate(&s.name, 28),
            mode,
            s.max_separator_error,
            s.margin_error,
            format!("{}/{}", s.base_unit, s.expected_base_unit),
            format!("{}x{}", s.panel_size[0], s.panel_size[1]),
            s.inked_panels,
            status,
        );
        if let Some(err) = &s.error {
            println!("    error: {err}");
        }
    }

    println!("{}", "-".repeat(84));
    println!(
        "Total: {} | Passed: {} | Failed: {}",
        report.total, report.passed, report.failed
    );
}

/// Render report as JSON.
pub fn to_json(report: &FullReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// Build a ScenarioReport from a scenario name, result, and threshold.
pub fn scenario_report(
    name: &str,
    category: &str,
    result: &SceneResult,
    has_ink: bool,
    threshold: u32,
) -> ScenarioReport {
    let passed = result.layout_ok(threshold)
        && result.margin_error == 0
        && result.calibration_ok()
        && result.panels_uniform
        && result.ink_ok(has_ink);

    ScenarioReport {
        name: name.to_string(),
        category: category.to_string(),
        passed,
        fallback: result.fallback_used,
        max_separator_error: result.max_separator_error,
        margin_error: result.margin_error,
        base_unit: result.base_unit,
        expected_base_unit: result.expected_base_unit,
        panel_size: result.panel_size,
        inked_panels: result.inked_panels,
        digitize_time_us: result.digitize_time_us,
        threshold,
        error: None,
    }
}

/// A failed report for a scenario that could not be built or digitized.
pub fn error_report(name: &str, category: &str, error: &dyn std::fmt::Display) -> ScenarioReport {
    ScenarioReport {
        name: name.to_string(),
        category: category.to_string(),
        passed: false,
        fallback: false,
        max_separator_error: 0,
        margin_error: 0,
        base_unit: 0,
        expected_base_unit: 0,
        panel_size: [0, 0],
        inked_panels: 0,
        digitize_time_us: 0,
        threshold: 0,
        error: Some(error.to_string()),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}…", &s[..max_len - 1])
    }
}
