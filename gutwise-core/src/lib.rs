//! GutWise Core Library
//!
//! Offline-first storage for GutWise clients: a best-effort persistent
//! store, a TTL cache for remote reads, a queue of mutations awaiting
//! delivery, and connectivity tracking that tells the queue when to drain.

pub mod auto_sync;
pub mod cache;
pub mod clock;
pub mod connectivity;
pub mod domain;
pub mod keys;
pub mod models;
pub mod queue;
pub mod storage;

pub use auto_sync::{spawn_auto_drain, spawn_auto_drain_with_retry, AutoDrain};
pub use cache::{CacheEntry, CacheManager, DEFAULT_TTL};
pub use clock::{Clock, ManualClock, SystemClock};
pub use connectivity::{ConnectivityMonitor, Subscription, DEFAULT_CONNECT_TIMEOUT};
pub use domain::{DomainStore, Record};
pub use keys::{StoreKey, DEFAULT_NAMESPACE};
pub use models::{
    Difficulty, Meal, MealFood, Pattern, PatternType, PortionSize, Product, ProductType, Recipe,
    Symptom, SymptomType, UserPreferences, ValidationError,
};
pub use queue::{DrainReport, SyncAction, SyncKind, SyncQueue, SyncQueueItem, DEFAULT_MAX_RETRIES};
pub use storage::{FileMedium, MemoryMedium, PersistentStore, StorageError, StorageMedium};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
