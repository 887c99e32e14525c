//! Wiring of the core stores for one CLI invocation.

use std::sync::Arc;

use gutwise_core::{
    CacheManager, Clock, ConnectivityMonitor, DomainStore, PersistentStore, SyncQueue,
    SystemClock,
};

use crate::config::Config;

/// The store, cache, queue and monitor shared by every command.
///
/// Built once at startup and passed by reference; `reset` is the explicit
/// teardown used on sign-out.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub store: PersistentStore,
    pub domain: DomainStore,
    pub cache: CacheManager,
    pub queue: Arc<SyncQueue>,
    pub monitor: ConnectivityMonitor,
}

impl AppContext {
    /// Builds the context over `store` using the configured TTL and retry cap.
    pub fn new(store: PersistentStore, config: &Config) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let cache =
            CacheManager::new(store.clone(), Arc::clone(&clock)).with_default_ttl(config.cache_ttl());
        let queue = SyncQueue::new(store.clone(), clock).with_max_retries(config.max_retries.value);

        Self {
            domain: DomainStore::new(store.clone()),
            cache,
            queue: Arc::new(queue),
            // Unknown until the first probe.
            monitor: ConnectivityMonitor::new(false),
            store,
        }
    }

    /// Opens the file-backed store in the configured data directory.
    pub fn open(config: &Config) -> Self {
        let store = PersistentStore::open(
            config.data_dir.value.clone(),
            config.namespace.value.clone(),
        );
        Self::new(store, config)
    }

    /// Builds a context whose data lives only for this process.
    #[cfg(test)]
    pub fn in_memory(config: &Config) -> Self {
        let store = PersistentStore::new(
            Arc::new(gutwise_core::MemoryMedium::new()),
            config.namespace.value.clone(),
        );
        Self::new(store, config)
    }

    /// Removes domain data, pending mutations and cached reads.
    pub fn reset(&self) -> bool {
        let data = self.domain.clear_all_data();
        let queue = self.queue.clear();
        let cache = self.cache.clear();
        data && queue && cache
    }
}
