//! Import and engine configuration

pub mod null_handling;

use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};

pub use null_handling::NullConfig;

use crate::PersistenceError;

/// Columns every imported CSV must carry (compared trimmed, case-insensitively)
pub const REQUIRED_COLUMNS: [&str; 4] = ["name", "email", "age", "role"];

/// How CSV text is read and validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Headers that must be present
    pub required_columns: Vec<String>,

    /// Field delimiter; must be a single-byte character
    pub delimiter: char,

    /// Reject records whose field count differs from the header's.
    /// When off, missing fields are absent and extra fields are dropped.
    pub strict_field_counts: bool,

    /// Import cells that are exactly a rendered number as numbers
    pub infer_numbers: bool,

    /// Null handling
    pub nulls: NullConfig,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            required_columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            delimiter: ',',
            strict_field_counts: false,
            infer_numbers: true,
            nulls: NullConfig::default(),
        }
    }
}

/// Settings for the whole engine, typically read from a JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// CSV import settings
    pub import: ImportConfig,

    /// Where the table snapshot is persisted; in-memory only if unset
    pub snapshot_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Parse a JSON document, defaulting missing fields
    pub fn from_json(text: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a JSON config file
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
