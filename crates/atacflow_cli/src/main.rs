//! atacflow CLI
//!
//! Runs the ATAC/ChIP-seq stage table on one sample, skipping stages whose
//! outputs already exist.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};

use atacflow_core::config::ConfigManager;
use atacflow_core::logging::{init_tracing, LogConfig, LogLevel};
use atacflow_core::models::AnalysisMode;
use atacflow_core::orchestrator::SampleProcessor;
use atacflow_core::process::ProcessRunner;
use atacflow_core::RunOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Atac,
    Chip,
}

impl From<Mode> for AnalysisMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Atac => AnalysisMode::Atac,
            Mode::Chip => AnalysisMode::Chip,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "atacflow", version)]
#[command(about = "Artifact-cached ATAC-seq / ChIP-seq processing pipeline", long_about = None)]
struct Cli {
    /// Sample to process (default: first raw sample without cleaned alignments)
    #[arg(short = 'i', long = "input")]
    sample: Option<String>,

    /// Stage to run; repeat for several (default: all default stages)
    #[arg(short = 's', long = "steps", value_name = "STAGE")]
    steps: Vec<String>,

    /// Clear and rebuild outputs even if they already exist
    #[arg(long)]
    force: bool,

    /// Path to TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override threads from the config file
    #[arg(long)]
    threads: Option<usize>,

    /// Analysis protocol; selects which raw sample directories are eligible
    #[arg(long, value_enum, default_value = "atac")]
    mode: Mode,

    /// Write the default configuration to this path and exit
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

/// Where the settings came from, for the startup log line.
fn config_source(manager: &ConfigManager) -> String {
    match manager.path() {
        Some(path) => format!("config file {}", path.display()),
        None => "built-in defaults".to_string(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    init_tracing(level);

    if let Some(path) = cli.write_default_config {
        ConfigManager::write_default(&path)
            .with_context(|| format!("writing default config to {}", path.display()))?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    if cli.threads == Some(0) {
        anyhow::bail!("--threads must be at least 1");
    }

    let mut manager = match cli.config {
        Some(ref path) => ConfigManager::new(path),
        None => ConfigManager::defaults(),
    };
    manager.load().context("loading configuration")?;
    tracing::info!("Using {}", config_source(&manager));

    let options = RunOptions {
        sample: cli.sample,
        stages: cli.steps,
        force: cli.force,
        threads: cli.threads,
        mode: cli.mode.into(),
    };

    let log_config = LogConfig {
        level,
        ..LogConfig::default()
    };
    let processor = SampleProcessor::new(manager.into_settings(), Arc::new(ProcessRunner::new()))
        .with_log_config(log_config);

    let report = processor.process(&options, None)?;
    tracing::info!(
        sample = %report.sample,
        ran = report.stages_ran.len(),
        cached = report.stages_cached.len(),
        "Run complete"
    );

    println!("Sample: {}", report.sample);
    if !report.stages_ran.is_empty() {
        println!("Ran: {}", report.stages_ran.join(", "));
    }
    if !report.stages_cached.is_empty() {
        println!("Already complete: {}", report.stages_cached.join(", "));
    }
    if let Some(log) = report.log_path {
        println!("Log: {}", log.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn repeated_steps_are_collected() {
        let cli = Cli::try_parse_from([
            "atacflow", "-i", "S1_ATAC", "-s", "align", "--steps", "filter", "--force",
            "--threads", "4",
        ])
        .unwrap();

        assert_eq!(cli.sample.as_deref(), Some("S1_ATAC"));
        assert_eq!(cli.steps, vec!["align".to_string(), "filter".to_string()]);
        assert!(cli.force);
        assert_eq!(cli.threads, Some(4));
        assert_eq!(cli.mode, Mode::Atac);
    }

    #[test]
    fn config_source_names_the_file() {
        assert_eq!(config_source(&ConfigManager::defaults()), "built-in defaults");
        assert_eq!(
            config_source(&ConfigManager::new("atacflow.toml")),
            "config file atacflow.toml"
        );
    }

    #[test]
    fn chip_mode_parses() {
        let cli = Cli::try_parse_from(["atacflow", "--mode", "chip"]).unwrap();
        assert_eq!(AnalysisMode::from(cli.mode), AnalysisMode::Chip);
        assert!(cli.steps.is_empty());
    }
}
