//! Console output formatter for cycle reports

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use edrr_application::{CycleReport, FlushOutcome};
use edrr_domain::{ConfigIssue, CycleStatus, Decision};

/// Formats cycle reports for console display
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleFormatter {
    /// Append the root cycle's final context to the summary
    pub show_context: bool,
}

impl ConsoleFormatter {
    pub fn new(show_context: bool) -> Self {
        Self { show_context }
    }

    /// Format the complete report
    pub fn summary(&self, report: &CycleReport) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("EDRR Cycle Report"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Root:".cyan().bold(), report.root_id));
        output.push_str(&format!(
            "{} {} (max depth {})\n",
            "Cycles:".cyan().bold(),
            report.cycles.len(),
            report.max_depth()
        ));

        output.push_str(&Self::section_header("Cycle Tree"));
        for cycle in &report.cycles {
            let mark = if cycle.status == CycleStatus::Completed {
                "v".green()
            } else {
                "x".red()
            };
            output.push_str(&format!(
                "{}{} {} [{}]\n",
                "  ".repeat(cycle.depth as usize),
                mark,
                cycle.task_id.bold(),
                cycle.phase
            ));
        }

        if !report.decisions.is_empty() {
            output.push_str(&Self::section_header("Decisions"));
            for decision in &report.decisions {
                output.push_str(&Self::decision_line(decision));
            }
        }

        if !report.declined.is_empty() || !report.recursion_errors.is_empty() {
            output.push_str(&Self::section_header("Recursion Stopped"));
            for declined in &report.declined {
                output.push_str(&format!(
                    "  * {} in {} of {}: {} ({})\n",
                    declined.task_id,
                    declined.phase,
                    declined.parent,
                    declined.decision.reason().yellow(),
                    declined.decision.detail
                ));
            }
            for error in &report.recursion_errors {
                output.push_str(&format!("  * {}\n", error.red()));
            }
        }

        if report.not_ready().next().is_some() {
            output.push_str(&Self::section_header("Quality Gates"));
            for verdict in report.not_ready() {
                let failing = verdict
                    .check
                    .failing()
                    .map(|(metric, check)| format!("{metric} {check}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                output.push_str(&format!(
                    "  * {} of {} not ready: {}\n",
                    verdict.phase,
                    verdict.cycle,
                    failing.yellow()
                ));
            }
        }

        output.push_str(&Self::section_header("Memory Sync"));
        output.push_str(&format!("  {}\n", Self::sync_counts(report)));

        output.push_str(&format!(
            "\n{} {} / {} bound, {} ms\n",
            "Steps:".cyan().bold(),
            report.steps,
            report.step_bound,
            report.elapsed_ms
        ));

        if self.show_context {
            output.push_str(&Self::section_header("Final Context"));
            output.push_str(&Self::indent(
                &serde_json::to_string_pretty(&report.final_context.to_value())
                    .unwrap_or_else(|_| "{}".to_string()),
                "  ",
            ));
            output.push('\n');
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn json(report: &CycleReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    /// One line per configuration issue, errors in red
    pub fn format_issues(issues: &[ConfigIssue]) -> String {
        issues
            .iter()
            .map(|issue| {
                let line = issue.to_string();
                if issue.is_error() {
                    line.red().to_string()
                } else {
                    line.yellow().to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn decision_line(decision: &Decision) -> String {
        let tallies = decision
            .tallies
            .iter()
            .map(|(option, tally)| format!("{option}={tally}"))
            .collect::<Vec<_>>()
            .join(", ");
        let chosen = if decision.is_synthesis() {
            format!("synthesis of {}", decision.conflicting_options.join(" + "))
                .yellow()
                .to_string()
        } else {
            decision.chosen().green().to_string()
        };
        format!(
            "  * {} ({}): {} via {} [{}]\n",
            decision.topic,
            decision.phase,
            chosen,
            decision.method.as_str(),
            tallies
        )
    }

    fn sync_counts(report: &CycleReport) -> String {
        let count = |outcome: FlushOutcome| report.sync.iter().filter(|s| s.outcome == outcome).count();
        let flushed: usize = report.sync.iter().map(|s| s.flushed).sum();
        format!(
            "{} committed, {} rolled back, {} skipped ({} update(s) written)",
            count(FlushOutcome::Committed),
            count(FlushOutcome::RolledBack),
            count(FlushOutcome::Skipped),
            flushed
        )
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_summary(&self, report: &CycleReport) -> String {
        self.summary(report)
    }

    fn format_json(&self, report: &CycleReport) -> String {
        Self::json(report)
    }
}
