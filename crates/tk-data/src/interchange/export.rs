//! CSV export of the visible columns

use chrono::NaiveDate;
use csv::{Terminator, WriterBuilder};
use tk_core::{Column, Row, TableState, TableStore};

use crate::ExportError;

/// Serializes rows to CSV text.
///
/// The header is the visible columns' labels in registry order. Every row
/// is written, regardless of the current search, sort or page.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl CsvExporter {
    pub fn new() -> Self {
        Self
    }

    /// Write `rows` under `columns`. Absent values become empty fields.
    pub fn export(&self, rows: &[Row], columns: &[&Column]) -> Result<String, ExportError> {
        if columns.is_empty() {
            return Ok(String::new());
        }

        let mut writer = WriterBuilder::new()
            .delimiter(b',')
            .terminator(Terminator::CRLF)
            .from_writer(Vec::new());

        writer.write_record(columns.iter().map(|c| c.label.as_str()))?;
        for row in rows {
            writer.write_record(columns.iter().map(|c| {
                row.value(&c.id)
                    .map(|value| value.render().into_owned())
                    .unwrap_or_default()
            }))?;
        }

        let bytes = writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| ExportError::Csv(e.to_string()))
    }

    /// Export every row of a snapshot under its visible columns
    pub fn export_state(&self, state: &TableState) -> Result<String, ExportError> {
        self.export(state.rows(), &state.visible_columns())
    }
}

/// Export the store's current rows as CSV
pub fn export_csv(store: &TableStore) -> Result<String, ExportError> {
    let snapshot = store.snapshot();
    let text = CsvExporter::new().export_state(&snapshot)?;
    tracing::info!(rows = snapshot.rows().len(), bytes = text.len(), "exported CSV");
    Ok(text)
}

/// Download name for an export made on `date`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("export_{}.csv", date.format("%Y-%m-%d"))
}
