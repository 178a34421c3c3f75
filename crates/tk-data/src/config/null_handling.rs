//! Null value handling for CSV import

use serde::{Serialize, Deserialize};

/// Which raw cells are imported as absent values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullConfig {
    /// Exact field contents that mean "no value"
    pub patterns: Vec<String>,

    /// Compare fields with surrounding whitespace removed
    pub trim_whitespace: bool,

    /// Compare patterns case-sensitively (ASCII only)
    pub case_sensitive: bool,
}

impl Default for NullConfig {
    fn default() -> Self {
        Self {
            // Only empty cells; markers like "N/A" stay text unless configured
            patterns: vec![String::new()],
            trim_whitespace: false,
            case_sensitive: true,
        }
    }
}

impl NullConfig {
    /// Whether a raw CSV field imports as [`CellValue::Null`](tk_core::CellValue::Null)
    pub fn is_null(&self, raw: &str) -> bool {
        let cell = if self.trim_whitespace { raw.trim() } else { raw };
        self.patterns.iter().any(|pattern| self.matches(cell, pattern))
    }

    fn matches(&self, cell: &str, pattern: &str) -> bool {
        if self.case_sensitive {
            cell == pattern
        } else {
            cell.eq_ignore_ascii_case(pattern)
        }
    }

    /// Treat `pattern` as null too; duplicates are ignored
    pub fn add_pattern(&mut self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }

    pub fn remove_pattern(&mut self, pattern: &str) {
        self.patterns.retain(|p| p != pattern);
    }
}
