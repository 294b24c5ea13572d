//! CLI entrypoint for edrr
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use edrr_application::{Agent, EdrrCoordinator, MAX_RECURSION_DEPTH, MemoryStore};
use edrr_domain::{CycleTask, OutputFormat};
use edrr_infrastructure::{
    ConfigLoader, FileConfig, InMemoryStore, JsonlAuditLogger, KeywordAgent, TaskPhaseHandler,
};
use edrr_presentation::{Cli, ConsoleFormatter, OutputFormatter, ProgressReporter};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if cli.show_config {
        println!("Configuration sources (in priority order):");
        for source in ConfigLoader::config_sources() {
            println!("  {source}");
        }
        return Ok(());
    }

    // === Configuration ===
    let file_config: FileConfig = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {e}"))?
    };

    if cli.no_color || !file_config.output.color {
        colored::control::set_override(false);
    }

    let (mut config, issues) = file_config.to_edrr_config();
    if !issues.is_empty() {
        eprintln!("{}", ConsoleFormatter::format_issues(&issues));
    }
    if issues.iter().any(|issue| issue.is_error()) {
        bail!("Configuration has errors");
    }

    if let Some(max_depth) = cli.max_depth {
        if max_depth > MAX_RECURSION_DEPTH {
            warn!("--max-depth {} is above {}, clamping", max_depth, MAX_RECURSION_DEPTH);
        }
        config = config.with_max_depth(max_depth);
    }

    let task = load_task(&cli)?;
    info!(task = %task.id, max_depth = config.recursion.max_depth(), "Starting edrr");

    // === Dependency Injection ===
    let agents: Vec<Arc<dyn Agent>> = file_config
        .agents
        .iter()
        .map(|entry| Arc::new(KeywordAgent::from_entry(entry)) as Arc<dyn Agent>)
        .collect();
    if agents.is_empty() {
        info!("No agents configured; phases run without consensus");
    }

    let stores: Vec<Arc<dyn MemoryStore>> = InMemoryStore::standard_set()
        .into_iter()
        .map(|store| Arc::new(store) as Arc<dyn MemoryStore>)
        .collect();

    let mut coordinator =
        EdrrCoordinator::new(config, Arc::new(TaskPhaseHandler::new()), agents, stores);

    if let Some(path) = cli.audit_log.as_ref().or(file_config.logging.audit_log.as_ref()) {
        let logger = JsonlAuditLogger::open(path)
            .with_context(|| format!("Failed to open audit log {}", path.display()))?;
        info!(path = %path.display(), "Writing audit trail");
        coordinator = coordinator.with_audit(Arc::new(logger));
    }

    // Execute with or without progress reporting
    let report = if cli.quiet {
        coordinator.run(task).await?
    } else {
        let progress = ProgressReporter::new();
        coordinator.run_with_progress(task, &progress).await?
    };

    // Output results
    let formatter = ConsoleFormatter::new(file_config.output.show_context);
    let format = cli
        .output
        .map(OutputFormat::from)
        .or(file_config.output.format)
        .unwrap_or_default();
    let output = match format {
        OutputFormat::Summary => formatter.format_summary(&report),
        OutputFormat::Json => formatter.format_json(&report),
    };

    println!("{}", output);

    Ok(())
}

/// The task from `--task <file>`, or one built from the positional description.
fn load_task(cli: &Cli) -> Result<CycleTask> {
    if let Some(path) = &cli.task {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read task file {}", path.display()))?;
        let task: CycleTask = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid task file {}", path.display()))?;
        return Ok(task);
    }

    match &cli.description {
        Some(description) if !description.trim().is_empty() => {
            Ok(CycleTask::new(cli.id.clone(), description.trim()))
        }
        _ => bail!("A task is required: pass a description or --task <file>"),
    }
}
