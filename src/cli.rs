//! Command-line interface argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// Highway maintenance dashboard
///
/// Reads a log of maintenance interventions (CSV or Excel) and prints the
/// headline metrics with interventions per type, per day and per crew, and
/// cost per day.
///
/// Examples:
///   maintenance-dashboard interventions.csv
///   maintenance-dashboard suivi.xlsx --format json
///   maintenance-dashboard            (interactive menu)
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Intervention log to analyse (.csv, .xlsx, .xls, .ods)
    ///
    /// Without a file, an interactive menu asks for one.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Rows shown in the data preview
    #[arg(long, value_name = "COUNT")]
    pub preview_rows: Option<usize>,

    /// Print every row after the aggregate views
    #[arg(long, conflicts_with = "no_details")]
    pub details: bool,

    /// Do not print the detailed rows
    #[arg(long, conflicts_with = "details")]
    pub no_details: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .maintenance-dashboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .maintenance-dashboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Tables for the terminal (default)
    #[default]
    Text,
    /// The whole dashboard as JSON
    Json,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }
        if self.format == OutputFormat::Json && self.file.is_none() && !self.init_config {
            return Err("--format json needs a FILE".to_string());
        }
        if let Some(ref file) = self.file {
            if !file.is_file() {
                return Err(format!("File does not exist: {}", file.display()));
            }
        }
        Ok(())
    }

    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        }
    }
}
