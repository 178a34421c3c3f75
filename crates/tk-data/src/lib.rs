//! CSV interchange and snapshot persistence for the table engine

pub mod config;
pub mod interchange;
pub mod persistence;

use thiserror::Error;
use tokio::task::JoinError;
use tk_core::SnapshotError;

// Re-exports
pub use config::{EngineConfig, ImportConfig, NullConfig};
pub use interchange::{
    export_csv, export_file_name, import_csv, spawn_import, CsvExporter, CsvImporter, ImportPhase,
};
pub use persistence::{JsonFileStore, MemorySnapshotStore, SnapshotStore, SnapshotWriter, WriterStats};

/// Reasons a CSV import is rejected. The table state is unchanged in every case.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Parse(String),

    #[error("No data found in file.")]
    EmptyDataset,

    #[error("CSV is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("import superseded by a newer import")]
    Superseded,

    #[error("import worker failed: {0}")]
    Worker(String),
}

impl From<csv::Error> for ImportError {
    fn from(error: csv::Error) -> Self {
        ImportError::Parse(error.to_string())
    }
}

impl From<JoinError> for ImportError {
    fn from(error: JoinError) -> Self {
        ImportError::Worker(error.to_string())
    }
}

/// Errors that can occur while serializing rows to CSV
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV writing error: {0}")]
    Csv(String),
}

impl From<csv::Error> for ExportError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => ExportError::Io(std::io::Error::new(io_err.kind(), error.to_string())),
            _ => ExportError::Csv(error.to_string()),
        }
    }
}

/// Errors that can occur while reading or writing snapshots.
/// Never fatal to the in-memory state.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("snapshot version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Join error: {0}")]
    Join(#[from] JoinError),
}

impl From<SnapshotError> for PersistenceError {
    fn from(error: SnapshotError) -> Self {
        match error {
            SnapshotError::UnsupportedVersion { found, supported } => {
                PersistenceError::UnsupportedVersion { found, supported }
            }
        }
    }
}
