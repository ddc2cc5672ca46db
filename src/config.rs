//! Configuration file handling.
//!
//! Settings live in an optional `.maintenance-dashboard.toml`. Every key has
//! a default, so a partial file (or none at all) is fine.

use crate::cli::Args;
use crate::loader::LoadOptions;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = ".maintenance-dashboard.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub parsing: ParsingConfig,
}

/// How the terminal dashboard is rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Rows in the data preview.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Decimal places for the headline metrics.
    #[serde(default = "default_decimals")]
    pub decimals: usize,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_duration_unit")]
    pub duration_unit: String,

    /// Print every row after the views.
    #[serde(default = "default_show_details")]
    pub show_details: bool,

    /// Width of the longest text bar.
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            preview_rows: default_preview_rows(),
            decimals: default_decimals(),
            currency: default_currency(),
            duration_unit: default_duration_unit(),
            show_details: default_show_details(),
            bar_width: default_bar_width(),
        }
    }
}

fn default_preview_rows() -> usize {
    5
}

fn default_decimals() -> usize {
    2
}

fn default_currency() -> String {
    "€".to_string()
}

fn default_duration_unit() -> String {
    "time units".to_string()
}

fn default_show_details() -> bool {
    true
}

fn default_bar_width() -> usize {
    30
}

/// How uploaded files are read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// Extra chrono date formats, tried before the built-in ones.
    #[serde(default)]
    pub date_formats: Vec<String>,

    /// Single-character CSV delimiter. Sniffed when unset.
    #[serde(default)]
    pub csv_delimiter: Option<char>,

    /// Read `1,5` as one and a half. Derived from the delimiter when unset.
    #[serde(default)]
    pub decimal_comma: Option<bool>,
}

impl ParsingConfig {
    pub fn load_options(&self) -> Result<LoadOptions> {
        let delimiter = match self.csv_delimiter {
            Some(c) if c.is_ascii() => Some(c as u8),
            Some(c) => bail!("csv_delimiter must be an ASCII character, got '{c}'"),
            None => None,
        };
        Ok(LoadOptions {
            date_formats: self.date_formats.clone(),
            delimiter,
            decimal_comma: self.decimal_comma,
        })
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load `.maintenance-dashboard.toml` from the working directory, if any.
    pub fn load_default() -> Result<Option<Self>> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::load(path).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Command-line flags win over file values.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(rows) = args.preview_rows {
            self.display.preview_rows = rows;
        }
        if args.details {
            self.display.show_details = true;
        }
        if args.no_details {
            self.display.show_details = false;
        }
    }
}
