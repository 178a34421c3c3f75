use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::RwLock;

use crate::events::{events, EventBus};
use crate::model::Row;
use crate::query::SortSpec;
use super::{ImportBatch, TableCommand, TableState};

/// Identifies one import attempt. Only the most recently issued ticket
/// may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportTicket(u64);

/// Result of a committed import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows: usize,
    pub added_columns: Vec<String>,
    pub revision: u64,
}

struct Versioned {
    revision: u64,
    state: Arc<TableState>,
}

struct StoreInner {
    current: RwLock<Versioned>,
    import_generation: AtomicU64,
    event_bus: Arc<EventBus>,
}

/// Shared container serializing every mutation of the table state.
///
/// Readers get an immutable `Arc<TableState>`; a command swaps in a new
/// state under the write lock, so a reader never sees a half-applied
/// command.
#[derive(Clone)]
pub struct TableStore {
    inner: Arc<StoreInner>,
}

impl TableStore {
    /// Create a store around an initial state
    pub fn new(state: TableState) -> Self {
        Self::with_event_bus(state, Arc::new(EventBus::new()))
    }

    /// Create a store publishing to an existing event bus
    pub fn with_event_bus(state: TableState, event_bus: Arc<EventBus>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                current: RwLock::new(Versioned {
                    revision: 0,
                    state: Arc::new(state),
                }),
                import_generation: AtomicU64::new(0),
                event_bus,
            }),
        }
    }

    /// The latest committed state
    pub fn snapshot(&self) -> Arc<TableState> {
        Arc::clone(&self.inner.current.read().state)
    }

    /// Number of commits since the store was created
    pub fn revision(&self) -> u64 {
        self.inner.current.read().revision
    }

    /// The event bus state changes are published on
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.inner.event_bus
    }

    /// Apply a command and return the new revision
    pub fn dispatch(&self, command: TableCommand) -> u64 {
        tracing::debug!(?command, "dispatching command");
        let (revision, snapshot) = self.commit(|state| state.apply(command));
        self.inner.event_bus.publish(events::StateChanged { revision, snapshot });
        revision
    }

    pub fn set_rows(&self, rows: Vec<Row>) -> u64 {
        self.dispatch(TableCommand::SetRows(rows))
    }

    pub fn set_search(&self, text: impl Into<String>) -> u64 {
        self.dispatch(TableCommand::SetSearch(text.into()))
    }

    pub fn set_sorting(&self, sorting: SortSpec) -> u64 {
        self.dispatch(TableCommand::SetSorting(sorting))
    }

    pub fn set_page(&self, page: usize) -> u64 {
        self.dispatch(TableCommand::SetPage(page))
    }

    pub fn toggle_column_visibility(&self, id: impl Into<String>) -> u64 {
        self.dispatch(TableCommand::ToggleColumnVisibility(id.into()))
    }

    pub fn add_column(&self, id: impl Into<String>, label: impl Into<String>) -> u64 {
        self.dispatch(TableCommand::AddColumn {
            id: id.into(),
            label: label.into(),
        })
    }

    /// Start an import. Any import started earlier can no longer commit.
    pub fn begin_import(&self) -> ImportTicket {
        ImportTicket(self.inner.import_generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` is still the newest import
    pub fn is_current_import(&self, ticket: ImportTicket) -> bool {
        self.inner.import_generation.load(Ordering::SeqCst) == ticket.0
    }

    /// Merge a validated import in one transition. Returns `None` without
    /// touching the state if a newer import has started since `ticket`.
    pub fn commit_import(&self, ticket: ImportTicket, batch: ImportBatch) -> Option<ImportSummary> {
        let rows = batch.rows.len();
        let mut guard = self.inner.current.write();
        if !self.is_current_import(ticket) {
            tracing::warn!(ticket = ticket.0, "discarding superseded import");
            return None;
        }
        let added_columns = Arc::make_mut(&mut guard.state).apply_import(batch);
        guard.revision += 1;
        let revision = guard.revision;
        let snapshot = Arc::clone(&guard.state);
        drop(guard);

        tracing::info!(rows, added = ?added_columns, revision, "import committed");
        self.inner.event_bus.publish(events::StateChanged { revision, snapshot });
        self.inner.event_bus.publish(events::ImportCommitted {
            rows,
            added_columns: added_columns.clone(),
        });

        Some(ImportSummary {
            rows,
            added_columns,
            revision,
        })
    }

    fn commit(&self, mutate: impl FnOnce(&mut TableState)) -> (u64, Arc<TableState>) {
        let mut guard = self.inner.current.write();
        mutate(Arc::make_mut(&mut guard.state));
        guard.revision += 1;
        (guard.revision, Arc::clone(&guard.state))
    }
}

impl Default for TableStore {
    fn default() -> Self {
        Self::new(TableState::default())
    }
}

impl std::fmt::Debug for TableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableStore")
            .field("revision", &self.revision())
            .field("import_generation", &self.inner.import_generation.load(Ordering::SeqCst))
            .finish()
    }
}
