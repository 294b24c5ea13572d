//! CLI command definitions

use clap::{Parser, ValueEnum};
use edrr_domain::OutputFormat;
use std::path::PathBuf;

/// Output format for the cycle report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Cycle tree, decisions and sync outcomes
    Summary,
    /// The full report as JSON
    Json,
}

impl From<ReportFormat> for OutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Summary => OutputFormat::Summary,
            ReportFormat::Json => OutputFormat::Json,
        }
    }
}

/// CLI arguments for edrr
#[derive(Parser, Debug)]
#[command(name = "edrr")]
#[command(author, version, about = "Recursive Expand-Differentiate-Refine-Retrospect task orchestrator")]
#[command(long_about = r#"
edrr runs a task through one EDRR cycle: Expand, Differentiate, Refine and
Retrospect. Phases may open nested micro-cycles for subtasks until the depth
limit or a termination heuristic stops them. A team of agents votes on the
approach in Differentiate.

Configuration files are loaded from (in priority order):
1. EDRR_* environment variables   e.g. EDRR_RECURSION__MAX_DEPTH=2
2. --config <path>                Explicit config file
3. ./edrr.toml                    Project-level config
4. ~/.config/edrr/config.toml     Global config

Example:
  edrr "Design a rate limiter"
  edrr --task task.json --max-depth 2 --output json
  edrr --audit-log audit.jsonl -v "Migrate the billing schema"
"#)]
pub struct Cli {
    /// Task description (ignored when --task is given)
    pub description: Option<String>,

    /// JSON file holding the task, with optional subtasks and metrics
    #[arg(short, long, value_name = "PATH")]
    pub task: Option<PathBuf>,

    /// Id of the task built from the description
    #[arg(long, value_name = "ID", default_value = "task")]
    pub id: String,

    /// Maximum micro-cycle nesting (0-10)
    #[arg(long, value_name = "N")]
    pub max_depth: Option<u32>,

    /// Append audit events to this JSONL file
    #[arg(long, value_name = "PATH")]
    pub audit_log: Option<PathBuf>,

    /// Output format (defaults to the configured one, then summary)
    #[arg(short, long, value_enum)]
    pub output: Option<ReportFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_description() {
        let cli = Cli::parse_from(["edrr", "-vv", "--max-depth", "2", "build a parser"]);
        assert_eq!(cli.description.as_deref(), Some("build a parser"));
        assert_eq!(cli.max_depth, Some(2));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.id, "task");
        assert!(cli.output.is_none());
    }

    #[test]
    fn test_task_file_and_output() {
        let cli = Cli::parse_from(["edrr", "--task", "task.json", "--output", "json", "--no-config"]);
        assert_eq!(cli.task, Some(PathBuf::from("task.json")));
        assert_eq!(cli.output.map(OutputFormat::from), Some(OutputFormat::Json));
        assert!(cli.no_config);
        assert!(cli.description.is_none());
    }

    #[test]
    fn test_verify_command() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
