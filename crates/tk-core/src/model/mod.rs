//! Table data model: cells, rows, columns

mod column;
mod row;
mod value;

pub use column::{Column, ColumnRegistry};
pub use row::{Row, RowStore};
pub use value::{format_number, parse_number_lossless, CellValue};

/// Canonical form for header names, required column names and row keys:
/// surrounding whitespace trimmed, lower-cased.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}
