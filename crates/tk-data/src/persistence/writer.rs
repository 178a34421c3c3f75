//! Background snapshot writer

use std::sync::Arc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tk_core::events::events;
use tk_core::{EventBus, TableState, TableStore};

use super::SnapshotStore;
use crate::PersistenceError;

/// Counters describing what the writer has done so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub written: u64,
    pub failed: u64,
    /// Snapshots replaced by a newer one before they were written
    pub coalesced: u64,
    /// Snapshots that arrived after a newer revision was already written
    pub stale: u64,
    pub last_revision: Option<u64>,
    pub last_error: Option<String>,
}

type Job = (u64, Arc<TableState>);

/// Persists snapshots on a single background task.
///
/// Scheduling never blocks. Writes happen one at a time; while a write is
/// in flight, pending snapshots collapse to the highest revision. A
/// snapshot at or below the last written revision is dropped, so events
/// delivered out of order never put an older state on disk. A failed
/// write is logged and reported, and the in-memory table is left alone.
pub struct SnapshotWriter {
    sender: mpsc::UnboundedSender<Job>,
    task: JoinHandle<()>,
    stats: Arc<Mutex<WriterStats>>,
}

impl SnapshotWriter {
    /// Spawn the writer task on the current tokio runtime
    pub fn spawn(store: Arc<dyn SnapshotStore>, event_bus: Option<Arc<EventBus>>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let stats = Arc::new(Mutex::new(WriterStats::default()));
        let task = tokio::spawn(run(store, receiver, Arc::clone(&stats), event_bus));
        Self { sender, task, stats }
    }

    /// Queue a snapshot for writing
    pub fn schedule(&self, revision: u64, snapshot: Arc<TableState>) {
        enqueue(&self.sender, revision, snapshot);
    }

    /// Persist every state `table` commits from now on
    pub fn attach(&self, table: &TableStore) {
        let sender = self.sender.downgrade();
        table.event_bus().subscribe(move |changed: &events::StateChanged| {
            match sender.upgrade() {
                Some(sender) => enqueue(&sender, changed.revision, Arc::clone(&changed.snapshot)),
                None => tracing::debug!(revision = changed.revision, "snapshot writer closed; change not persisted"),
            }
        });
    }

    pub fn stats(&self) -> WriterStats {
        self.stats.lock().clone()
    }

    /// Write whatever is still pending and stop the task
    pub async fn close(self) -> Result<WriterStats, PersistenceError> {
        let Self { sender, task, stats } = self;
        drop(sender);
        task.await?;
        let stats = stats.lock().clone();
        Ok(stats)
    }
}

fn enqueue(sender: &mpsc::UnboundedSender<Job>, revision: u64, snapshot: Arc<TableState>) {
    if sender.send((revision, snapshot)).is_err() {
        tracing::warn!(revision, "snapshot writer has stopped; snapshot not persisted");
    }
}

async fn run(
    store: Arc<dyn SnapshotStore>,
    mut receiver: mpsc::UnboundedReceiver<Job>,
    stats: Arc<Mutex<WriterStats>>,
    event_bus: Option<Arc<EventBus>>,
) {
    let mut last_written: Option<u64> = None;
    while let Some(mut job) = receiver.recv().await {
        let mut coalesced = 0;
        while let Ok(other) = receiver.try_recv() {
            if other.0 > job.0 {
                job = other;
            }
            coalesced += 1;
        }
        let (revision, snapshot) = job;

        if last_written.is_some_and(|written| revision <= written) {
            tracing::debug!(revision, ?last_written, "dropping stale snapshot");
            let mut stats = stats.lock();
            stats.coalesced += coalesced;
            stats.stale += 1;
            continue;
        }

        let result = store.save(&snapshot).await;
        if result.is_ok() {
            last_written = Some(revision);
        }
        {
            let mut stats = stats.lock();
            stats.coalesced += coalesced;
            match &result {
                Ok(()) => {
                    stats.written += 1;
                    stats.last_revision = Some(revision);
                }
                Err(error) => {
                    stats.failed += 1;
                    stats.last_error = Some(error.to_string());
                }
            }
        }

        match result {
            Ok(()) => {
                tracing::debug!(revision, location = %store.location(), "snapshot persisted");
                if let Some(bus) = &event_bus {
                    bus.publish(events::SnapshotPersisted { revision });
                }
            }
            Err(error) => {
                tracing::warn!(revision, %error, location = %store.location(), "failed to persist snapshot");
                if let Some(bus) = &event_bus {
                    bus.publish(events::PersistenceFailed {
                        error: error.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tk_core::TableCommand;
    use crate::persistence::MemorySnapshotStore;

    struct FailingStore;

    #[async_trait]
    impl SnapshotStore for FailingStore {
        async fn load(&self) -> Result<Option<TableState>, PersistenceError> {
            Ok(None)
        }

        async fn save(&self, _snapshot: &TableState) -> Result<(), PersistenceError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn location(&self) -> String {
            "nowhere".to_string()
        }
    }

    #[tokio::test]
    async fn test_latest_snapshot_is_written() {
        let backend = Arc::new(MemorySnapshotStore::new());
        let table = TableStore::new(TableState::seeded());
        let writer = SnapshotWriter::spawn(backend.clone(), None);
        writer.attach(&table);

        table.set_search("admin");
        table.set_page(0);
        table.add_column("department", "Department");

        let stats = writer.close().await.unwrap();
        assert_eq!(stats.last_revision, Some(3));
        assert_eq!(stats.written + stats.coalesced, 3);
        assert_eq!(stats.failed, 0);

        let stored = backend.load().await.unwrap().unwrap();
        assert_eq!(stored.search(), "admin");
        assert_eq!(stored.columns().len(), 5);
    }

    fn searched(text: &str) -> Arc<TableState> {
        let mut state = TableState::seeded();
        state.apply(TableCommand::SetSearch(text.into()));
        Arc::new(state)
    }

    #[tokio::test]
    async fn test_pending_snapshots_keep_highest_revision() {
        let backend = Arc::new(MemorySnapshotStore::new());
        let writer = SnapshotWriter::spawn(backend.clone(), None);
        writer.schedule(2, searched("second"));
        writer.schedule(1, searched("first"));

        let stats = writer.close().await.unwrap();
        assert_eq!(stats.written, 1);
        assert_eq!(stats.coalesced, 1);
        assert_eq!(stats.last_revision, Some(2));
        assert_eq!(backend.load().await.unwrap().unwrap().search(), "second");
    }

    #[tokio::test]
    async fn test_late_older_revision_does_not_overwrite() {
        let backend = Arc::new(MemorySnapshotStore::new());
        let writer = SnapshotWriter::spawn(backend.clone(), None);

        writer.schedule(2, searched("second"));
        while writer.stats().written == 0 {
            tokio::task::yield_now().await;
        }
        writer.schedule(1, searched("first"));

        let stats = writer.close().await.unwrap();
        assert_eq!(stats.written, 1);
        assert_eq!(stats.stale, 1);
        assert_eq!(stats.last_revision, Some(2));
        assert_eq!(backend.load().await.unwrap().unwrap().search(), "second");
    }

    #[tokio::test]
    async fn test_failures_do_not_touch_state() {
        let bus = Arc::new(EventBus::new());
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&failures);
        bus.subscribe(move |_: &events::PersistenceFailed| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let table = TableStore::with_event_bus(TableState::seeded(), Arc::clone(&bus));
        let writer = SnapshotWriter::spawn(Arc::new(FailingStore), Some(bus));
        writer.attach(&table);
        table.set_search("user");

        let stats = writer.close().await.unwrap();
        assert_eq!(stats.failed, 1);
        assert!(stats.last_error.unwrap().contains("read-only"));
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert_eq!(table.snapshot().search(), "user");
    }

    #[tokio::test]
    async fn test_attached_writer_does_not_keep_channel_open() {
        let backend = Arc::new(MemorySnapshotStore::new());
        let table = TableStore::default();
        let writer = SnapshotWriter::spawn(backend, None);
        writer.attach(&table);
        writer.close().await.unwrap();

        // The handler outlives the writer and must stay harmless
        table.set_page(3);
        assert_eq!(table.revision(), 1);
    }
}
