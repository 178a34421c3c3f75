//! Rows and the row store

use std::sync::Arc;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{normalize_key, CellValue};

/// One record, addressed by column id.
///
/// Rows are schema-less: a missing key and a `Null` value both mean absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(IndexMap<String, CellValue>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw cell for a column id, including explicit nulls
    pub fn get(&self, column_id: &str) -> Option<&CellValue> {
        self.0.get(column_id)
    }

    /// Cell for a column id, treating explicit nulls as absent
    pub fn value(&self, column_id: &str) -> Option<&CellValue> {
        self.0.get(column_id).filter(|v| !v.is_null())
    }

    /// Set a cell, keeping the key's original position if it already exists
    pub fn insert(&mut self, column_id: impl Into<String>, value: impl Into<CellValue>) {
        self.0.insert(column_id.into(), value.into());
    }

    /// Rewrite every key to its normalized form. When two keys collide,
    /// the later value wins and the earlier key's position is kept.
    pub fn normalize_keys(self) -> Row {
        let mut normalized = IndexMap::with_capacity(self.0.len());
        for (key, value) in self.0 {
            normalized.insert(normalize_key(&key), value);
        }
        Row(normalized)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Owns the current ordered sequence of rows.
///
/// The rows sit behind an `Arc` so snapshots share them; contents are only
/// ever replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowStore {
    rows: Arc<Vec<Row>>,
}

impl RowStore {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows: Arc::new(rows) }
    }

    /// Replace all rows
    pub fn replace(&mut self, rows: Vec<Row>) {
        self.rows = Arc::new(rows);
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Shared handle to the current rows
    pub fn shared(&self) -> Arc<Vec<Row>> {
        Arc::clone(&self.rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<Row>> for RowStore {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

impl Serialize for RowStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows.as_slice().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RowStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Row>::deserialize(deserializer).map(RowStore::new)
    }
}
