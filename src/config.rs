use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Top-level configuration
// ---------------------------------------------------------------------------

/// Loader and query options, usually read from a TOML file:
///
/// ```toml
/// [loader]
/// delimiter = ";"
/// excluded_departments = ["97", "98", "99"]
///
/// [loader.columns]
/// name = "preusuel"
///
/// [query]
/// gap_policy = "zero_fill"
/// ```
///
/// Every field falls back to a default matching the INSEE `dpt2020.csv` layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub loader: LoaderConfig,
    pub query: QueryConfig,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }
}

// ---------------------------------------------------------------------------
// Loader options
// ---------------------------------------------------------------------------

/// Source file format. When unset the loader picks one from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Json,
    Parquet,
}

/// Names of the five required columns in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub name: String,
    pub sex: String,
    pub year: String,
    pub department: String,
    pub count: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            name: "preusuel".to_string(),
            sex: "sexe".to_string(),
            year: "annais".to_string(),
            department: "dpt".to_string(),
            count: "nombre".to_string(),
        }
    }
}

/// Source values standing for each sex, besides the letters `F` and `M`.
/// INSEE codes boys as `1` and girls as `2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SexCodes {
    pub female: String,
    pub male: String,
}

impl Default for SexCodes {
    fn default() -> Self {
        Self {
            female: "2".to_string(),
            male: "1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub format: Option<SourceFormat>,
    /// Field delimiter for CSV sources.
    pub delimiter: char,
    pub columns: ColumnNames,
    pub sex_codes: SexCodes,
    /// Placeholder names dropped at load (INSEE groups rare names under one).
    pub skip_names: Vec<String>,
    /// Year value marking rows with an unknown birth year; those rows are dropped.
    pub unknown_year_marker: Option<String>,
    /// Department codes dropped at load (overseas and abroad aggregates).
    pub excluded_departments: Vec<String>,
    pub uppercase_names: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            format: None,
            delimiter: ';',
            columns: ColumnNames::default(),
            sex_codes: SexCodes::default(),
            skip_names: vec!["_PRENOMS_RARES".to_string()],
            unknown_year_marker: Some("XXXX".to_string()),
            excluded_departments: vec!["97".to_string(), "98".to_string(), "99".to_string()],
            uppercase_names: true,
        }
    }
}

impl LoaderConfig {
    /// A configuration that keeps every row as-is: no skipping, no case folding.
    pub fn verbatim() -> Self {
        Self {
            skip_names: Vec::new(),
            unknown_year_marker: None,
            excluded_departments: Vec::new(),
            uppercase_names: false,
            ..Self::default()
        }
    }

    /// The delimiter as a single byte, as required by the `csv` crate.
    pub(crate) fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(u32::from(self.delimiter))
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                Error::Config(format!(
                    "delimiter '{}' is not a single ASCII character",
                    self.delimiter
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Query options
// ---------------------------------------------------------------------------

/// How `time_series` treats years without any matching record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    #[default]
    Omit,
    ZeroFill,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub gap_policy: GapPolicy,
    pub default_top_n: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            gap_policy: GapPolicy::Omit,
            default_top_n: 10,
        }
    }
}
