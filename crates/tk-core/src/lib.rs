//! Core functionality for the table engine
//!
//! This crate provides the table data model, the query pipeline and the
//! shared state container the rest of the system mutates through.

pub mod events;
pub mod model;
pub mod query;
pub mod state;

// Re-export commonly used types
pub use events::{Event, EventBus};
pub use model::{normalize_key, CellValue, Column, ColumnRegistry, Row, RowStore};
pub use query::{
    run_query, Pagination, Query, QueryResult, SortDirection, SortSpec, DEFAULT_PAGE_SIZE,
};
pub use state::{
    ImportBatch, ImportSummary, ImportTicket, SnapshotError, TableCommand, TableState,
    TableStore, CURRENT_SNAPSHOT_VERSION,
};
