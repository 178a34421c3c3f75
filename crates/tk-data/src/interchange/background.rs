//! Imports parsed off the calling task
//!
//! Parsing and validation run on the blocking pool; only the final commit
//! touches the table. The most recently started import wins: a slower,
//! older import that finishes later is discarded with
//! [`ImportError::Superseded`].

use tokio::task::JoinHandle;
use tk_core::{ImportSummary, TableStore};

use super::import::{report_failure, CsvImporter};
use crate::config::ImportConfig;
use crate::ImportError;

/// Start importing `text` into `store` in the background.
///
/// The import is ordered against other imports at the moment this is
/// called, not when the returned task first runs.
pub fn spawn_import(store: TableStore, text: String, config: ImportConfig) -> JoinHandle<Result<ImportSummary, ImportError>> {
    let ticket = store.begin_import();
    tokio::spawn(async move {
        let prepared = tokio::task::spawn_blocking(move || {
            let mut importer = CsvImporter::new(config);
            importer.prepare(&text).map(|batch| (importer, batch))
        })
        .await
        .map_err(ImportError::from)
        .and_then(|result| result);

        let result = match prepared {
            Ok((mut importer, batch)) => importer.commit(&store, ticket, batch),
            Err(error) => Err(error),
        };
        if let Err(error) = &result {
            report_failure(&store, error);
        }
        result
    })
}
