//! ferrotrack CLI: runs the Iris training job and records it in the
//! tracking store.

use anyhow::Context;
use clap::Parser;
use ferrotrack_ml::{MlConfig, TrainingJob};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Train a logistic-regression classifier on Iris and log the run
#[derive(Parser, Debug)]
#[command(name = "ferrotrack", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (tracking store and artifacts resolve against it)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Experiment name to record the run under
    #[arg(short, long)]
    experiment: Option<String>,

    /// Name for this run (generated when omitted)
    #[arg(long)]
    run_name: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Command-line values take precedence over every config layer.
    fn apply_overrides(&self, config: &mut MlConfig) {
        if let Some(experiment) = &self.experiment {
            config.tracking.experiment_name = experiment.clone();
        }
        if let Some(run_name) = &self.run_name {
            config.tracking.run_name = Some(run_name.clone());
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Human-readable layer on stderr; stdout carries only the result line
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(cli.log_filter()));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "ferrotrack", "ferrotrack")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "ferrotrack.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    std::fs::create_dir_all(&cli.workspace)
        .with_context(|| format!("creating workspace {}", cli.workspace.display()))?;
    let workspace = cli
        .workspace
        .canonicalize()
        .with_context(|| format!("resolving workspace {}", cli.workspace.display()))?;

    if cli.config.is_none() && !ferrotrack_core::config::config_exists(&workspace) {
        tracing::debug!(workspace = %workspace.display(), "No ferrotrack.toml, using defaults");
    }
    let mut config = MlConfig::load(Some(&workspace), cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    cli.apply_overrides(&mut config);

    let report = TrainingJob::new(config, &workspace).run()?;
    tracing::info!(
        experiment_id = %report.experiment_id,
        run_id = %report.run_id,
        run_name = %report.run_name,
        train_rows = report.train_rows,
        test_rows = report.test_rows,
        "Training run finished"
    );
    if !report.converged {
        tracing::warn!(iterations = report.iterations, "Solver stopped before converging");
    }

    println!("Model accuracy: {:.4}", report.accuracy);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["ferrotrack"]).unwrap();
        assert_eq!(cli.workspace, PathBuf::from("."));
        assert!(cli.config.is_none());
        assert_eq!(cli.log_filter(), "info");
    }

    #[test]
    fn test_verbosity_levels() {
        let quiet = Cli::try_parse_from(["ferrotrack", "-q"]).unwrap();
        assert_eq!(quiet.log_filter(), "error");
        let debug = Cli::try_parse_from(["ferrotrack", "-v"]).unwrap();
        assert_eq!(debug.log_filter(), "debug");
        let trace = Cli::try_parse_from(["ferrotrack", "-vvv"]).unwrap();
        assert_eq!(trace.log_filter(), "trace");
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let cli = Cli::try_parse_from([
            "ferrotrack",
            "-e",
            "nightly",
            "--run-name",
            "build-42",
            "-w",
            "/tmp/ws",
        ])
        .unwrap();
        let mut config = MlConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.tracking.experiment_name, "nightly");
        assert_eq!(config.tracking.run_name.as_deref(), Some("build-42"));
        assert_eq!(cli.workspace, PathBuf::from("/tmp/ws"));
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let cli = Cli::try_parse_from(["ferrotrack"]).unwrap();
        let mut config = MlConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config, MlConfig::default());
    }
}
