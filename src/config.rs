use serde::{Deserialize, Serialize};

/// Charges above `median * threshold` are flagged as overcharges.
pub const DEFAULT_OVERCHARGE_THRESHOLD: f64 = 1.5;

/// More than this many issues pushes the report severity to `high`.
pub const DEFAULT_HIGH_SEVERITY_ISSUE_COUNT: usize = 5;

/// Tunable analysis policy. Everything here is a policy constant, not logic:
/// changing a value never changes which checks run, only where they draw lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Overcharge trigger multiplier applied to the benchmark median.
    pub overcharge_threshold: f64,
    /// Issue count above which a report is rated `high` severity.
    pub high_severity_issue_count: usize,
    /// Two-letter region code for benchmark price adjustment, if known.
    pub region: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            overcharge_threshold: DEFAULT_OVERCHARGE_THRESHOLD,
            high_severity_issue_count: DEFAULT_HIGH_SEVERITY_ISSUE_COUNT,
            region: None,
        }
    }
}

impl AnalysisConfig {
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn with_overcharge_threshold(mut self, threshold: f64) -> Self {
        self.overcharge_threshold = threshold;
        self
    }
}
