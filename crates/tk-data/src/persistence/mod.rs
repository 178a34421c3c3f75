//! Snapshot persistence
//!
//! The table state is stored as one versioned JSON document. Older
//! documents load with defaults for missing fields.

mod writer;

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tk_core::TableState;

use crate::PersistenceError;

pub use writer::{SnapshotWriter, WriterStats};

/// Durable home for table snapshots
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the stored snapshot, upgraded to the current layout.
    /// `None` if nothing has been stored yet.
    async fn load(&self) -> Result<Option<TableState>, PersistenceError>;

    /// Replace the stored snapshot
    async fn save(&self, snapshot: &TableState) -> Result<(), PersistenceError>;

    /// Human-readable location, for logs
    fn location(&self) -> String;
}

/// Parse a stored snapshot document and bring it to the current layout
pub fn decode_snapshot(text: &str) -> Result<TableState, PersistenceError> {
    let state: TableState = serde_json::from_str(text)?;
    Ok(state.upgrade()?)
}

/// Serialize a snapshot, stamped with the time of writing
pub fn encode_snapshot(snapshot: &TableState) -> Result<String, PersistenceError> {
    let mut stamped = snapshot.clone();
    stamped.stamp_saved(Utc::now());
    Ok(serde_json::to_string_pretty(&stamped)?)
}

/// Snapshot stored as a JSON file.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write never leaves a truncated snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> Result<Option<TableState>, PersistenceError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state = decode_snapshot(&text)?;
        tracing::info!(path = %self.path.display(), rows = state.rows().len(), "loaded snapshot");
        Ok(Some(state))
    }

    async fn save(&self, snapshot: &TableState) -> Result<(), PersistenceError> {
        let document = encode_snapshot(snapshot)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, document.as_bytes()).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        tracing::debug!(path = %self.path.display(), bytes = document.len(), "saved snapshot");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Snapshot kept in memory as its serialized document
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    document: Mutex<Option<String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last saved document, if any
    pub fn document(&self) -> Option<String> {
        self.document.lock().clone()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<TableState>, PersistenceError> {
        let document = self.document.lock().clone();
        document.as_deref().map(decode_snapshot).transpose()
    }

    async fn save(&self, snapshot: &TableState) -> Result<(), PersistenceError> {
        let document = encode_snapshot(snapshot)?;
        *self.document.lock() = Some(document);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
