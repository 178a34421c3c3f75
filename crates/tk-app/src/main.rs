//! Command-line front end for the table engine

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tk_core::{SortDirection, SortSpec, TableState, TableStore};
use tk_data::{
    export_csv, export_file_name, spawn_import, EngineConfig, JsonFileStore, MemorySnapshotStore,
    SnapshotStore, SnapshotWriter,
};

#[derive(Parser, Debug)]
#[command(name = "tablekeeper", version, about = "Import, query and export a persistent table")]
struct Cli {
    /// JSON engine configuration
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Snapshot file; overrides the configured path
    #[arg(long, value_name = "PATH")]
    state: Option<PathBuf>,

    /// Start from the demo rows instead of the stored snapshot
    #[arg(long)]
    reset: bool,

    /// Replace the rows with a CSV file
    #[arg(long, value_name = "CSV")]
    import: Option<PathBuf>,

    /// Add a column, as `id` or `id=Label`
    #[arg(long = "add-column", value_name = "ID[=LABEL]")]
    add_column: Vec<String>,

    /// Toggle a column's visibility
    #[arg(long, value_name = "ID")]
    toggle: Vec<String>,

    /// Search text; an empty string clears it
    #[arg(long)]
    search: Option<String>,

    /// Sort ascending by a column
    #[arg(long, value_name = "ID", conflicts_with = "cycle")]
    sort: Option<String>,

    /// Sort descending instead
    #[arg(long, requires = "sort")]
    desc: bool,

    /// Advance a column's sort: ascending, descending, unsorted
    #[arg(long, value_name = "ID")]
    cycle: Option<String>,

    /// Clear the sort
    #[arg(long, conflicts_with_all = ["sort", "cycle"])]
    unsort: bool,

    /// Zero-based page to show
    #[arg(long)]
    page: Option<usize>,

    /// Export every row as CSV; `-` writes to stdout, no value uses export_<date>.csv
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    export: Option<Option<String>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let snapshots: Arc<dyn SnapshotStore> = match cli.state.clone().or(config.snapshot_path.clone()) {
        Some(path) => Arc::new(JsonFileStore::new(path)),
        None => Arc::new(MemorySnapshotStore::new()),
    };

    let initial = if cli.reset {
        TableState::seeded()
    } else {
        match snapshots.load().await {
            Ok(Some(state)) => state,
            Ok(None) => {
                info!(location = %snapshots.location(), "no snapshot yet, starting from demo rows");
                TableState::seeded()
            }
            Err(error) => {
                warn!(%error, location = %snapshots.location(), "could not load snapshot, starting from demo rows");
                TableState::seeded()
            }
        }
    };

    let store = TableStore::new(initial);
    let writer = SnapshotWriter::spawn(Arc::clone(&snapshots), Some(Arc::clone(store.event_bus())));
    writer.attach(&store);

    let outcome = apply(&cli, &config, &store).await;

    let stats = writer.close().await.context("snapshot writer stopped unexpectedly")?;
    if stats.failed > 0 {
        warn!(failed = stats.failed, last_error = ?stats.last_error, "some snapshots were not persisted");
    }
    outcome
}

async fn apply(cli: &Cli, config: &EngineConfig, store: &TableStore) -> Result<()> {
    if let Some(path) = &cli.import {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let summary = spawn_import(store.clone(), text, config.import.clone())
            .await
            .context("import task failed")??;
        info!(rows = summary.rows, added = ?summary.added_columns, "imported {}", path.display());
    }

    for spec in &cli.add_column {
        let (id, label) = spec.split_once('=').unwrap_or((spec.as_str(), spec.as_str()));
        if id.trim().is_empty() {
            bail!("column id in {spec:?} is empty");
        }
        store.add_column(id, label);
    }

    for id in &cli.toggle {
        if !store.snapshot().columns().contains(id) {
            warn!(column = %id, "no such column");
        }
        store.toggle_column_visibility(id.as_str());
    }

    if let Some(search) = &cli.search {
        store.set_search(search.as_str());
    }

    if let Some(column) = &cli.sort {
        let direction = if cli.desc { SortDirection::Desc } else { SortDirection::Asc };
        store.set_sorting(SortSpec::new(column.as_str(), Some(direction)));
    } else if let Some(column) = &cli.cycle {
        let next = store.snapshot().sorting().cycle(column);
        store.set_sorting(next);
    } else if cli.unsort {
        store.set_sorting(SortSpec::unsorted());
    }

    if let Some(page) = cli.page {
        store.set_page(page);
    }

    match &cli.export {
        Some(Some(target)) if target == "-" => {
            print!("{}", export_csv(store)?);
            return Ok(());
        }
        Some(target) => {
            let path = target
                .clone()
                .unwrap_or_else(|| export_file_name(chrono::Local::now().date_naive()));
            let text = export_csv(store)?;
            tokio::fs::write(&path, text)
                .await
                .with_context(|| format!("failed to write {path}"))?;
            info!(path = %path, "wrote export");
        }
        None => {}
    }

    print_page(&store.snapshot());
    Ok(())
}

fn print_page(state: &TableState) {
    let columns = state.visible_columns();
    let result = state.query();
    let pagination = state.pagination();

    println!("{}", columns.iter().map(|c| c.label.as_str()).collect::<Vec<_>>().join("\t"));
    for row in &result.page_rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| row.value(&c.id).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        println!("{}", cells.join("\t"));
    }

    let pages = pagination.page_count(result.total_matched).max(1);
    println!(
        "-- page {} of {}, {} matching of {} rows",
        pagination.page + 1,
        pages,
        result.total_matched,
        state.rows().len()
    );
}
