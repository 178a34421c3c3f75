//! Typed publish/subscribe for table notifications

use std::any::{Any, TypeId};
use std::sync::Arc;
use ahash::AHashMap;
use parking_lot::RwLock;

/// Anything that can be published on an [`EventBus`]
pub trait Event: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

type Handler = Arc<dyn Fn(&dyn Event) + Send + Sync>;

/// Table-wide event bus.
///
/// Handlers run synchronously on the publishing thread, in subscription
/// order. The handler list is copied before dispatch, so a handler may
/// publish or subscribe on the same bus.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<AHashMap<TypeId, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every published `E`
    pub fn subscribe<E: Event>(&self, handler: impl Fn(&E) + Send + Sync + 'static) {
        let erased: Handler = Arc::new(move |event: &dyn Event| {
            if let Some(event) = event.as_any().downcast_ref::<E>() {
                handler(event);
            }
        });
        self.handlers
            .write()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(erased);
    }

    pub fn publish<E: Event>(&self, event: E) {
        let handlers = self.handlers.read().get(&TypeId::of::<E>()).cloned();
        for handler in handlers.into_iter().flatten() {
            handler(&event);
        }
    }

    /// Number of handlers listening for `E`
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.handlers
            .read()
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.handlers.read().len())
            .finish()
    }
}

/// Events published by the table engine
pub mod events {
    use std::sync::Arc;
    use super::Event;
    use crate::state::TableState;

    /// A command or import committed a new state
    #[derive(Debug, Clone)]
    pub struct StateChanged {
        pub revision: u64,
        pub snapshot: Arc<TableState>,
    }

    /// A CSV import replaced the rows
    #[derive(Debug, Clone)]
    pub struct ImportCommitted {
        pub rows: usize,
        pub added_columns: Vec<String>,
    }

    /// A CSV import was rejected; state is unchanged
    #[derive(Debug, Clone)]
    pub struct ImportFailed {
        pub reason: String,
    }

    /// A snapshot reached durable storage
    #[derive(Debug, Clone)]
    pub struct SnapshotPersisted {
        pub revision: u64,
    }

    /// Writing a snapshot failed; in-memory state is kept
    #[derive(Debug, Clone)]
    pub struct PersistenceFailed {
        pub error: String,
    }

    macro_rules! table_events {
        ($($t:ty),* $(,)?) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        };
    }

    table_events!(
        StateChanged,
        ImportCommitted,
        ImportFailed,
        SnapshotPersisted,
        PersistenceFailed,
    );
}
