//! Table state: the persistable snapshot and its command handlers

mod seed;
mod store;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::model::{Column, ColumnRegistry, Row, RowStore};
use crate::query::{run_query, Pagination, Query, QueryResult, SortSpec, DEFAULT_PAGE_SIZE};

pub use seed::demo_rows;
pub use store::{ImportSummary, ImportTicket, TableStore};

/// Snapshot layout version written by this build.
///
/// Version 1 is the first layout (`pagination.rowsPerPage`, columns
/// without an explicit `visible` flag).
pub const CURRENT_SNAPSHOT_VERSION: u32 = 2;

/// Errors raised while bringing a loaded snapshot up to date
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// A state transition. Each command is applied atomically.
#[derive(Debug, Clone, PartialEq)]
pub enum TableCommand {
    /// Replace all rows
    SetRows(Vec<Row>),
    /// Set the search text and go back to the first page
    SetSearch(String),
    /// Replace the sort order
    SetSorting(SortSpec),
    /// Jump to a page; out-of-range pages yield an empty view
    SetPage(usize),
    /// Show or hide a column
    ToggleColumnVisibility(String),
    /// Append a column unless the id is taken
    AddColumn { id: String, label: String },
}

/// Parsed and validated import, ready to be merged into the state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportBatch {
    /// Normalized CSV headers in file order, without duplicates
    pub headers: Vec<String>,
    /// Records keyed by normalized headers
    pub rows: Vec<Row>,
}

/// Complete table state: schema, rows and query parameters.
///
/// This is the unit of persistence. Missing fields in a stored snapshot
/// fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableState {
    #[serde(default = "legacy_version")]
    version: u32,
    #[serde(default)]
    rows: RowStore,
    #[serde(default = "ColumnRegistry::standard")]
    columns: ColumnRegistry,
    #[serde(default)]
    sorting: SortSpec,
    #[serde(default)]
    pagination: Pagination,
    #[serde(default)]
    search: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
}

fn legacy_version() -> u32 {
    1
}

impl Default for TableState {
    fn default() -> Self {
        Self {
            version: CURRENT_SNAPSHOT_VERSION,
            rows: RowStore::default(),
            columns: ColumnRegistry::standard(),
            sorting: SortSpec::default(),
            pagination: Pagination::default(),
            search: String::new(),
            saved_at: None,
        }
    }
}

impl TableState {
    /// Standard columns and no rows
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard columns with the twenty demo rows
    pub fn seeded() -> Self {
        Self {
            rows: RowStore::new(demo_rows()),
            ..Self::default()
        }
    }

    /// Apply one command
    pub fn apply(&mut self, command: TableCommand) {
        match command {
            TableCommand::SetRows(rows) => self.rows.replace(rows),
            TableCommand::SetSearch(text) => {
                self.search = text;
                self.pagination.page = 0;
            }
            TableCommand::SetSorting(sorting) => self.sorting = sorting,
            TableCommand::SetPage(page) => self.pagination.page = page,
            TableCommand::ToggleColumnVisibility(id) => {
                if self.columns.toggle_visibility(&id).is_none() {
                    tracing::debug!(column = %id, "visibility toggle for unknown column ignored");
                }
            }
            TableCommand::AddColumn { id, label } => {
                self.columns.add_column(id, label);
            }
        }
    }

    /// Merge an import: add a column for every header not already present
    /// (compared trimmed and case-insensitively), replace the rows and go
    /// back to the first page. Existing columns are never altered.
    ///
    /// Returns the ids of the columns that were added.
    pub fn apply_import(&mut self, batch: ImportBatch) -> Vec<String> {
        let mut added = Vec::new();
        for header in batch.headers {
            if !self.columns.contains_normalized(&header) && self.columns.add_column(header.clone(), header.clone()) {
                added.push(header);
            }
        }
        self.rows.replace(batch.rows);
        self.pagination.page = 0;
        added
    }

    /// Bring a loaded snapshot to the current layout
    pub fn upgrade(mut self) -> Result<Self, SnapshotError> {
        if self.version > CURRENT_SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_SNAPSHOT_VERSION,
            });
        }
        if self.version < CURRENT_SNAPSHOT_VERSION {
            tracing::info!(from = self.version, to = CURRENT_SNAPSHOT_VERSION, "upgrading snapshot");
            self.version = CURRENT_SNAPSHOT_VERSION;
        }
        // Page size is not configurable
        if self.pagination.page_size != DEFAULT_PAGE_SIZE {
            tracing::warn!(stored = self.pagination.page_size.get(), "ignoring stored page size");
            self.pagination.page_size = DEFAULT_PAGE_SIZE;
        }
        Ok(self)
    }

    /// Record when this snapshot was written
    pub fn stamp_saved(&mut self, at: DateTime<Utc>) {
        self.saved_at = Some(at);
    }

    /// Current page of the filtered, sorted rows
    pub fn query(&self) -> QueryResult<'_> {
        let visible = self.columns.list_visible();
        run_query(
            self.rows.rows(),
            &Query {
                visible_columns: &visible,
                search: &self.search,
                sort: &self.sorting,
                pagination: &self.pagination,
            },
        )
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn rows(&self) -> &[Row] {
        self.rows.rows()
    }

    pub fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    /// Visible columns in registry order
    pub fn visible_columns(&self) -> Vec<&Column> {
        self.columns.list_visible()
    }

    pub fn sorting(&self) -> &SortSpec {
        &self.sorting
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at
    }
}
