//! CSV interchange: import into and export out of a table store

mod background;
mod export;
mod import;

pub use background::spawn_import;
pub use export::{export_csv, export_file_name, CsvExporter};
pub use import::{import_csv, new_columns, CsvImporter, ImportPhase, ParsedCsv};
