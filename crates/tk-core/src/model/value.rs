//! Scalar cell values

use std::borrow::Cow;
use std::fmt;
use serde::{Serialize, Deserialize};

/// Largest magnitude at which every integer is exactly representable in an `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A single cell: text, a number, or absent.
///
/// Serialized untagged, so a persisted row reads as a plain JSON object
/// (`{"name": "Alice", "age": 22, "note": null}`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Whether the cell holds no value
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view of the cell, only for cells typed as numbers
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String representation used for searching, comparing and exporting.
    /// Absent values render as the empty string.
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            CellValue::Null => Cow::Borrowed(""),
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Number(n) => Cow::Owned(format_number(*n)),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

/// Render a number the way a user typed it: integral values drop the
/// fractional part (`22`, not `22.0`).
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parse `text` as a number only if rendering the number gives back
/// exactly `text`. Keeps values like `007` or `1e3` as text.
pub fn parse_number_lossless(text: &str) -> Option<f64> {
    let n: f64 = text.parse().ok()?;
    if !n.is_finite() {
        return None;
    }
    (format_number(n) == text).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(CellValue::Null.render(), "");
        assert_eq!(CellValue::from("Admin").render(), "Admin");
        assert_eq!(CellValue::from(22i64).render(), "22");
        assert_eq!(CellValue::from(22.5).render(), "22.5");
        assert_eq!(CellValue::from(-0.0).render(), "0");
    }

    #[test]
    fn test_lossless_number_parsing() {
        assert_eq!(parse_number_lossless("22"), Some(22.0));
        assert_eq!(parse_number_lossless("-3.25"), Some(-3.25));
        assert_eq!(parse_number_lossless("007"), None);
        assert_eq!(parse_number_lossless("1e3"), None);
        assert_eq!(parse_number_lossless("+4"), None);
        assert_eq!(parse_number_lossless("NaN"), None);
        assert_eq!(parse_number_lossless(" 5"), None);
        assert_eq!(parse_number_lossless(""), None);
    }

    #[test]
    fn test_untagged_json_shape() {
        let values: Vec<CellValue> = serde_json::from_str(r#"[null, 30, "Bob"]"#).unwrap();
        assert_eq!(values, vec![CellValue::Null, CellValue::Number(30.0), CellValue::from("Bob")]);
        assert_eq!(serde_json::to_string(&values).unwrap(), r#"[null,30.0,"Bob"]"#);
    }
}
