//! Command-line interface for recipe-audit.
//!
//! # Commands
//!
//! - `list` - presence table: which recipes have `meta.yaml` and test scripts
//! - `audit` - full pipeline over every recipe, text or JSON output
//! - `report` - audit and write the dated Markdown reports
//! - `sanitize <recipe>` - show what the sanitizer (and renderer) make of one document
//!
//! # Global options
//!
//! - `-v, --verbose` / `-q, --quiet` - log level (`RUST_LOG` takes precedence)
//! - `-c, --config <FILE>` - configuration file (see [`crate::config`])
//! - `--aggregate <DIR>` - aggregate directory, overriding the configuration
//! - `--no-progress` - never draw progress bars

mod audit;
mod list;
mod report;
mod sanitize;

pub use audit::AuditCommand;
pub use list::ListCommand;
pub use report::ReportCommand;
pub use sanitize::SanitizeCommand;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::AuditConfig;
use crate::utils::ProgressBar;

/// Output format for commands with machine-readable output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored
    #[default]
    Text,
    /// Pretty-printed JSON on stdout
    Json,
}

/// Settings derived from global flags, resolved once before a command runs.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    pub no_progress: bool,
    pub config_path: Option<PathBuf>,
    pub aggregate_dir: Option<PathBuf>,
}

/// Everything a subcommand needs to run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: AuditConfig,
    /// Configuration file in use, if any
    pub config_file: Option<PathBuf>,
    pub no_progress: bool,
}

impl RunContext {
    /// Progress bar for `len` recipes, hidden under `--no-progress`.
    pub fn progress_bar(&self, len: usize) -> ProgressBar {
        if self.no_progress {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(len as u64)
        }
    }
}

#[derive(Parser)]
#[command(
    name = "recipe-audit",
    about = "Audit packaging recipes for missing or undeclared tests",
    version,
    long_about = "recipe-audit inventories the test scripts of every recipe in an aggregate \
                  directory and classifies the test section of each templated meta.yaml. \
                  It never runs the tests it finds."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a recipe-audit.toml configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Aggregate directory holding one directory per recipe
    #[arg(long, global = true, value_name = "DIR")]
    aggregate: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which recipes have a meta.yaml and test scripts
    List(ListCommand),
    /// Sanitize, parse and classify every recipe's meta.yaml
    Audit(AuditCommand),
    /// Audit and write dated Markdown reports
    Report(ReportCommand),
    /// Print the sanitized document of one recipe
    Sanitize(SanitizeCommand),
}

impl Cli {
    /// Derive the [`CliConfig`] from global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
            config_path: self.config.clone(),
            aggregate_dir: self.aggregate.clone(),
        }
    }

    /// Install the global tracing subscriber. `RUST_LOG` wins over the flags.
    pub fn init_logging(&self) {
        let config = self.build_config();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        let context = load_context(&config).await?;
        match self.command {
            Commands::List(cmd) => cmd.execute(&context),
            Commands::Audit(cmd) => cmd.execute(&context).await,
            Commands::Report(cmd) => cmd.execute(&context).await,
            Commands::Sanitize(cmd) => cmd.execute(&context).await,
        }
    }
}

/// Resolve configuration and apply flag overrides.
async fn load_context(cli: &CliConfig) -> Result<RunContext> {
    let cwd = std::env::current_dir().context("Failed to determine the current directory")?;
    let (mut config, config_file) = AuditConfig::load(cli.config_path.as_deref(), &cwd).await?;

    if let Some(aggregate) = &cli.aggregate_dir {
        config.aggregate_dir = aggregate.clone();
    }
    if let Some(file) = &config_file {
        tracing::debug!("Using configuration from {}", file.display());
    }

    Ok(RunContext {
        config,
        config_file,
        no_progress: cli.no_progress,
    })
}

/// Compile a `--filter` glob.
pub(crate) fn recipe_filter(filter: Option<&str>) -> Result<Option<glob::Pattern>> {
    filter
        .map(|f| glob::Pattern::new(f).with_context(|| format!("Invalid --filter pattern '{f}'")))
        .transpose()
}
