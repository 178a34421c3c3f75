//! Column definitions and the ordered column registry

use indexmap::IndexMap;
use serde::{Serialize, Deserialize};

use super::normalize_key;

/// A named, hideable field of the table schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Stable identifier rows are keyed by (case-sensitive)
    pub id: String,

    /// Display name, also the CSV export header
    pub label: String,

    /// Whether the column is displayed and exported
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl Column {
    /// Create a visible column
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            visible: true,
        }
    }
}

/// Ordered set of columns with unique ids.
///
/// Insertion order is the canonical column order for display and export.
/// Columns are never removed, only hidden.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Column>", into = "Vec<Column>")]
pub struct ColumnRegistry {
    columns: IndexMap<String, Column>,
}

impl ColumnRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The four columns every table starts with
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for (id, label) in [("name", "Name"), ("email", "Email"), ("age", "Age"), ("role", "Role")] {
            registry.add_column(id, label);
        }
        registry
    }

    /// Append a visible column unless one with the same id exists.
    ///
    /// Returns `true` if the column was added. An existing column keeps its
    /// label, visibility and position.
    pub fn add_column(&mut self, id: impl Into<String>, label: impl Into<String>) -> bool {
        let id = id.into();
        if self.columns.contains_key(&id) {
            return false;
        }
        let column = Column::new(id.clone(), label);
        self.columns.insert(id, column);
        true
    }

    /// Flip visibility of a column, returning the new state.
    /// Unknown ids are ignored.
    pub fn toggle_visibility(&mut self, id: &str) -> Option<bool> {
        self.columns.get_mut(id).map(|column| {
            column.visible = !column.visible;
            column.visible
        })
    }

    /// Visible columns in registry order
    pub fn list_visible(&self) -> Vec<&Column> {
        self.columns.values().filter(|c| c.visible).collect()
    }

    /// Get a column by exact id
    pub fn get(&self, id: &str) -> Option<&Column> {
        self.columns.get(id)
    }

    /// Whether a column with exactly this id exists
    pub fn contains(&self, id: &str) -> bool {
        self.columns.contains_key(id)
    }

    /// Whether a column id matches `key` after trimming and lower-casing both
    pub fn contains_normalized(&self, key: &str) -> bool {
        let key = normalize_key(key);
        self.columns.keys().any(|id| normalize_key(id) == key)
    }

    /// All columns in registry order
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl From<Vec<Column>> for ColumnRegistry {
    fn from(columns: Vec<Column>) -> Self {
        let mut registry = Self::new();
        for column in columns {
            // First occurrence of an id wins, as with add_column
            registry.columns.entry(column.id.clone()).or_insert(column);
        }
        registry
    }
}

impl From<ColumnRegistry> for Vec<Column> {
    fn from(registry: ColumnRegistry) -> Self {
        registry.columns.into_values().collect()
    }
}
