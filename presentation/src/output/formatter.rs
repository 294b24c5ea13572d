//! Output formatter trait

use edrr_application::CycleReport;

/// Trait for formatting cycle reports
pub trait OutputFormatter {
    /// Human-readable summary
    fn format_summary(&self, report: &CycleReport) -> String;

    /// Format as JSON
    fn format_json(&self, report: &CycleReport) -> String;
}
