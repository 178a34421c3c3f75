//! CSV import: parse, validate, reconcile, commit
//!
//! Nothing touches the table until the final commit, which adds the new
//! columns and swaps the rows in one transition. A failure in any earlier
//! phase leaves the table exactly as it was.

use csv::ReaderBuilder;
use tk_core::events::events;
use tk_core::model::parse_number_lossless;
use tk_core::{normalize_key, CellValue, ImportBatch, ImportSummary, ImportTicket, Row, TableState, TableStore};

use crate::config::ImportConfig;
use crate::ImportError;

/// Where an import currently stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImportPhase {
    #[default]
    Idle,
    Parsing,
    Validating,
    Reconciling,
    Committed,
    Failed(ImportError),
}

/// Records read from CSV text, keyed by the raw header names
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub records: Vec<Row>,
}

/// Drives one CSV text through the import phases
#[derive(Debug, Clone, Default)]
pub struct CsvImporter {
    config: ImportConfig,
    phase: ImportPhase,
}

impl CsvImporter {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            phase: ImportPhase::Idle,
        }
    }

    pub fn phase(&self) -> &ImportPhase {
        &self.phase
    }

    /// Import `text` into `store`, replacing its rows.
    pub fn import(&mut self, store: &TableStore, text: &str) -> Result<ImportSummary, ImportError> {
        let ticket = store.begin_import();
        let result = self
            .prepare(text)
            .and_then(|batch| self.commit(store, ticket, batch));
        if let Err(error) = &result {
            self.phase = ImportPhase::Failed(error.clone());
            report_failure(store, error);
        }
        result
    }

    /// Parse and validate without touching any table
    pub fn prepare(&mut self, text: &str) -> Result<ImportBatch, ImportError> {
        let parsed = self.parse(text)?;
        self.validate(parsed)
    }

    /// Read header-keyed records from CSV text
    pub fn parse(&mut self, text: &str) -> Result<ParsedCsv, ImportError> {
        self.phase = ImportPhase::Parsing;
        let delimiter = u8::try_from(self.config.delimiter).map_err(|_| {
            ImportError::Parse(format!("delimiter {:?} is not a single-byte character", self.config.delimiter))
        })?;

        if let Some(line) = find_unterminated_quote(text, delimiter) {
            return Err(ImportError::Parse(format!("unterminated quoted field starting on line {}", line)));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(!self.config.strict_field_counts)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut records = Vec::new();
        let mut ragged = 0usize;
        for result in reader.records() {
            let record = result?;
            if record.len() > headers.len() {
                ragged += 1;
            }

            let row: Row = headers
                .iter()
                .zip(record.iter())
                .filter(|(header, _)| !header.trim().is_empty())
                .map(|(header, field)| (header.as_str(), self.cell(field)))
                .collect();
            records.push(row);
        }

        if ragged > 0 {
            tracing::warn!(records = ragged, "dropped fields beyond the header width");
        }
        tracing::debug!(headers = headers.len(), records = records.len(), "parsed CSV");

        Ok(ParsedCsv { headers, records })
    }

    /// Check the record count and required headers, then normalize keys
    pub fn validate(&mut self, parsed: ParsedCsv) -> Result<ImportBatch, ImportError> {
        self.phase = ImportPhase::Validating;
        if parsed.records.is_empty() {
            return Err(ImportError::EmptyDataset);
        }

        let mut headers: Vec<String> = Vec::with_capacity(parsed.headers.len());
        for header in parsed.headers.iter().map(|h| normalize_key(h)) {
            if header.is_empty() {
                tracing::warn!("ignoring blank CSV header");
            } else if !headers.contains(&header) {
                headers.push(header);
            }
        }

        let missing: Vec<String> = self
            .config
            .required_columns
            .iter()
            .map(|c| normalize_key(c))
            .filter(|required| !headers.contains(required))
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns(missing));
        }

        let rows = parsed.records.into_iter().map(Row::normalize_keys).collect();
        Ok(ImportBatch { headers, rows })
    }

    /// Commit a validated batch if no newer import has started
    pub fn commit(&mut self, store: &TableStore, ticket: ImportTicket, batch: ImportBatch) -> Result<ImportSummary, ImportError> {
        self.phase = ImportPhase::Reconciling;
        let pending = new_columns(&store.snapshot(), &batch);
        tracing::debug!(new_columns = ?pending, rows = batch.rows.len(), "reconciling import");

        let summary = store.commit_import(ticket, batch).ok_or(ImportError::Superseded)?;
        self.phase = ImportPhase::Committed;
        Ok(summary)
    }

    fn cell(&self, field: &str) -> CellValue {
        if self.config.nulls.is_null(field) {
            return CellValue::Null;
        }
        if self.config.infer_numbers {
            if let Some(n) = parse_number_lossless(field) {
                return CellValue::Number(n);
            }
        }
        CellValue::Text(field.to_string())
    }
}

/// Headers of `batch` that `state` has no column for yet
pub fn new_columns<'b>(state: &TableState, batch: &'b ImportBatch) -> Vec<&'b str> {
    batch
        .headers
        .iter()
        .filter(|h| !state.columns().contains_normalized(h))
        .map(String::as_str)
        .collect()
}

/// Import `text` into `store` with `config`
pub fn import_csv(store: &TableStore, text: &str, config: &ImportConfig) -> Result<ImportSummary, ImportError> {
    CsvImporter::new(config.clone()).import(store, text)
}

pub(crate) fn report_failure(store: &TableStore, error: &ImportError) {
    tracing::warn!(%error, "CSV import failed");
    store.event_bus().publish(events::ImportFailed {
        reason: error.to_string(),
    });
}

/// Line on which a quoted field opens without ever closing, if any.
///
/// Quotes only start a quoted field at the beginning of a field; a quote
/// inside an unquoted field is literal text.
fn find_unterminated_quote(text: &str, delimiter: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut line = 1;
    let mut quote_line = 0;
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_quotes {
            if b == b'"' {
                if bytes.get(i + 1) == Some(&b'"') {
                    i += 2;
                    continue;
                }
                in_quotes = false;
            } else if b == b'\n' {
                line += 1;
            }
        } else if b == b'"' && at_field_start {
            in_quotes = true;
            quote_line = line;
        } else if b == b'\n' {
            line += 1;
        }
        at_field_start = !in_quotes && (b == delimiter || b == b'\n' || b == b'\r');
        i += 1;
    }

    in_quotes.then_some(quote_line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PEOPLE: &str = "Name,Email,Age,Role,Department\n\
        Zed,zed@example.com,41,Admin,Ops\n\
        Yara,yara@example.com,35,User,\n\
        Xavi,xavi@example.com,007,Owner,Sales\n";

    fn ids(state: &TableState) -> Vec<String> {
        state.columns().iter().map(|c| c.id.clone()).collect()
    }

    #[test]
    fn test_import_adds_columns_and_replaces_rows() {
        let store = TableStore::new(TableState::seeded());
        store.set_page(1);

        let summary = import_csv(&store, PEOPLE, &ImportConfig::default()).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.added_columns, vec!["department".to_string()]);

        let state = store.snapshot();
        assert_eq!(ids(&state), vec!["name", "email", "age", "role", "department"]);
        assert_eq!(state.columns().get("department").unwrap().label, "department");
        assert_eq!(state.rows().len(), 3);
        assert_eq!(state.pagination().page, 0);

        let first = &state.rows()[0];
        assert_eq!(first.value("name"), Some(&CellValue::from("Zed")));
        assert_eq!(first.value("age"), Some(&CellValue::Number(41.0)));
        assert_eq!(first.value("department"), Some(&CellValue::from("Ops")));
        assert_eq!(state.rows()[1].value("department"), None);
        assert_eq!(state.rows()[2].value("age"), Some(&CellValue::from("007")));
    }

    #[test]
    fn test_missing_columns_lists_all_and_keeps_state() {
        let store = TableStore::new(TableState::seeded());
        let before = store.snapshot();
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&failures);
        store.event_bus().subscribe(move |_: &events::ImportFailed| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut importer = CsvImporter::default();
        let error = importer.import(&store, " NAME ,Department\nZed,Ops\n").unwrap_err();

        assert_eq!(
            error,
            ImportError::MissingColumns(vec!["email".into(), "age".into(), "role".into()])
        );
        assert_eq!(error.to_string(), "CSV is missing required columns: email, age, role");
        assert_eq!(importer.phase(), &ImportPhase::Failed(error));
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.revision(), 0);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_header_only_csv_is_empty() {
        let store = TableStore::new(TableState::seeded());
        let error = import_csv(&store, "name,email,age,role\n", &ImportConfig::default()).unwrap_err();
        assert_eq!(error, ImportError::EmptyDataset);
        assert_eq!(import_csv(&store, "", &ImportConfig::default()).unwrap_err(), ImportError::EmptyDataset);
        assert_eq!(store.snapshot().rows().len(), 20);
    }

    #[test]
    fn test_unterminated_quote_is_a_parse_error() {
        let store = TableStore::new(TableState::seeded());
        let text = "name,email,age,role\nAnn,\"ann@example.com,30,User\n";
        match import_csv(&store, text, &ImportConfig::default()) {
            Err(ImportError::Parse(message)) => assert!(message.contains("line 2"), "{message}"),
            other => panic!("expected parse error, got {other:?}"),
        }
        assert_eq!(store.snapshot().rows().len(), 20);
    }

    #[test]
    fn test_quoted_fields_and_literal_quotes() {
        let mut importer = CsvImporter::default();
        let parsed = importer
            .parse("name,email,age,role\n\"Smith, \"\"J\"\"\",j@x.io,5\" tall,\"multi\nline\"\n")
            .unwrap();
        let row = &parsed.records[0];
        assert_eq!(row.value("name"), Some(&CellValue::from("Smith, \"J\"")));
        assert_eq!(row.value("age"), Some(&CellValue::from("5\" tall")));
        assert_eq!(row.value("role"), Some(&CellValue::from("multi\nline")));
    }

    #[test]
    fn test_ragged_records() {
        let mut importer = CsvImporter::default();
        let parsed = importer.parse("name,email,age,role\nAnn,a@x.io\nBen,b@x.io,30,User,extra\n").unwrap();
        assert_eq!(parsed.records[0].len(), 2);
        assert_eq!(parsed.records[0].value("role"), None);
        assert_eq!(parsed.records[1].len(), 4);

        let mut strict = CsvImporter::new(ImportConfig {
            strict_field_counts: true,
            ..ImportConfig::default()
        });
        assert!(matches!(
            strict.parse("name,email,age,role\nAnn,a@x.io\n"),
            Err(ImportError::Parse(_))
        ));
    }

    #[test]
    fn test_reconciliation_is_case_insensitive_and_keeps_labels() {
        let mut state = TableState::seeded();
        state.apply(tk_core::TableCommand::AddColumn { id: "Team".into(), label: "My Team".into() });
        let store = TableStore::new(state);

        let summary = import_csv(
            &store,
            "name,email,age,role, TEAM ,Team\nAnn,a@x.io,30,User,Red,Blue\n",
            &ImportConfig::default(),
        )
        .unwrap();
        assert!(summary.added_columns.is_empty());

        let state = store.snapshot();
        assert_eq!(state.columns().get("Team").unwrap().label, "My Team");
        assert_eq!(state.columns().len(), 5);
        // Duplicate headers collapse onto one key; the last value wins
        assert_eq!(state.rows()[0].value("team"), Some(&CellValue::from("Blue")));
    }

    #[test]
    fn test_blank_headers_are_ignored() {
        let store = TableStore::default();
        let summary = import_csv(&store, "name,email,age,role,\nAnn,a@x.io,30,User,x\n", &ImportConfig::default()).unwrap();
        assert!(summary.added_columns.is_empty());
        assert_eq!(store.snapshot().rows()[0].len(), 4);
    }

    #[test]
    fn test_custom_delimiter_and_nulls() {
        let mut config = ImportConfig {
            delimiter: ';',
            infer_numbers: false,
            ..ImportConfig::default()
        };
        config.nulls.add_pattern("N/A");
        let store = TableStore::default();
        import_csv(&store, "name;email;age;role\nAnn;N/A;30;User\n", &config).unwrap();

        let state = store.snapshot();
        assert_eq!(state.rows()[0].get("email"), Some(&CellValue::Null));
        assert_eq!(state.rows()[0].value("age"), Some(&CellValue::from("30")));

        let bad = ImportConfig {
            delimiter: '→',
            ..ImportConfig::default()
        };
        assert!(matches!(import_csv(&store, "a", &bad), Err(ImportError::Parse(_))));
    }

    #[test]
    fn test_stale_ticket_is_superseded() {
        let store = TableStore::new(TableState::seeded());
        let mut importer = CsvImporter::default();
        let batch = importer.prepare(PEOPLE).unwrap();
        let stale = store.begin_import();
        store.begin_import();

        assert_eq!(importer.commit(&store, stale, batch), Err(ImportError::Superseded));
        assert_eq!(store.snapshot().rows().len(), 20);
        assert_eq!(importer.phase(), &ImportPhase::Reconciling);
    }

    #[test]
    fn test_find_unterminated_quote() {
        assert_eq!(find_unterminated_quote("a,\"b\"\"c\"\n", b','), None);
        assert_eq!(find_unterminated_quote("a,b\"c\n", b','), None);
        assert_eq!(find_unterminated_quote("a\nb\n\"c\nd", b','), Some(3));
    }
}
