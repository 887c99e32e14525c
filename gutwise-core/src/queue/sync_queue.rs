//! Durable queue of pending mutations.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use super::item::{SyncAction, SyncKind, SyncQueueItem};
use crate::clock::Clock;
use crate::keys::StoreKey;
use crate::storage::{PersistentStore, StorageError};

/// Failed deliveries after which an item is dropped.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Outcome of one [`SyncQueue::drain`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Another drain was already running; nothing was attempted.
    pub skipped: bool,
    /// Ids delivered and removed.
    pub sent: Vec<String>,
    /// Ids that failed and stay queued with a higher retry count.
    pub retried: Vec<String>,
    /// Ids that reached the retry cap and were dropped.
    pub dropped: Vec<String>,
    /// Queue writes that failed during the pass.
    pub storage_faults: usize,
}

impl DrainReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Number of items handed to the send function.
    pub fn attempted(&self) -> usize {
        self.sent.len() + self.retried.len() + self.dropped.len()
    }
}

enum FailureOutcome {
    Retrying(u32),
    Dropped(SyncQueueItem),
    Missing,
}

/// Resets the in-flight flag when a drain ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Persistent FIFO of mutations awaiting delivery.
///
/// Every change to the persisted list is a read-modify-write of the current
/// stored state under one lock, so a retry write-back never overwrites an
/// item enqueued while a drain was waiting on the network.
pub struct SyncQueue {
    store: PersistentStore,
    clock: Arc<dyn Clock>,
    key: String,
    max_retries: u32,
    write_lock: Mutex<()>,
    draining: AtomicBool,
}

impl SyncQueue {
    pub fn new(store: PersistentStore, clock: Arc<dyn Clock>) -> Self {
        let key = store.key(StoreKey::SyncQueue);
        Self {
            store,
            clock,
            key,
            max_retries: DEFAULT_MAX_RETRIES,
            write_lock: Mutex::new(()),
            draining: AtomicBool::new(false),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Appends a new mutation. Returns the queued item, or `None` if the
    /// payload could not be encoded or the queue could not be written.
    pub fn enqueue<T: Serialize + ?Sized>(
        &self,
        kind: SyncKind,
        action: SyncAction,
        payload: &T,
    ) -> Option<SyncQueueItem> {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to encode {} {} payload: {}", action, kind, e);
                return None;
            }
        };

        let item = SyncQueueItem::new(kind, action, payload, self.clock.now());
        let queued = item.clone();

        match self.mutate(move |items| items.push(item)) {
            Ok(()) => {
                tracing::debug!("Queued {}", queued);
                Some(queued)
            }
            Err(e) => {
                tracing::error!("Failed to enqueue {} {}: {}", action, kind, e);
                None
            }
        }
    }

    /// Snapshot of the queue in FIFO order.
    pub fn peek_all(&self) -> Vec<SyncQueueItem> {
        self.store.get(&self.key).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.peek_all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peek_all().is_empty()
    }

    /// Removes the item with `id`. Returns `false` if it was not queued or
    /// the queue could not be written.
    pub fn remove(&self, id: &str) -> bool {
        match self.mutate(|items| remove_by_id(items, id).is_some()) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::error!("Failed to remove queue item {}: {}", id, e);
                false
            }
        }
    }

    /// Empties the queue unconditionally.
    pub fn clear(&self) -> bool {
        let _lock = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.set(&self.key, &Vec::<SyncQueueItem>::new())
    }

    /// Attempts delivery of every item queued at the time of the call.
    ///
    /// Items are passed to `send` in FIFO order. `Ok(true)` removes the
    /// item; `Ok(false)` and `Err(_)` count as a failed attempt. An item
    /// whose retry count reaches the cap is dropped and logged. Items
    /// enqueued during the pass wait for the next one.
    ///
    /// At most one drain runs at a time; a call made while another is in
    /// flight returns at once with [`DrainReport::skipped`] set.
    pub async fn drain<F, Fut, E>(&self, mut send: F) -> DrainReport
    where
        F: FnMut(SyncQueueItem) -> Fut,
        Fut: Future<Output = Result<bool, E>>,
        E: Display,
    {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Drain already in progress, skipping");
            return DrainReport::skipped();
        }
        let _guard = DrainGuard(&self.draining);

        let snapshot = self.peek_all();
        let mut report = DrainReport::default();

        if !snapshot.is_empty() {
            tracing::info!("Draining {} queued item(s)", snapshot.len());
        }

        for item in snapshot {
            let id = item.id.clone();

            let delivered = match send(item).await {
                Ok(delivered) => delivered,
                Err(e) => {
                    tracing::warn!("Sending queue item {} failed: {}", id, e);
                    false
                }
            };

            if delivered {
                match self.mutate(|items| remove_by_id(items, &id)) {
                    Ok(Some(_)) => report.sent.push(id),
                    Ok(None) => {
                        tracing::debug!("Queue item {} left the queue during drain", id);
                    }
                    Err(e) => {
                        tracing::error!("Failed to remove delivered item {}: {}", id, e);
                        report.storage_faults += 1;
                    }
                }
                continue;
            }

            match self.record_failure(&id) {
                Ok(FailureOutcome::Retrying(attempts)) => {
                    tracing::debug!(
                        "Queue item {} failed ({}/{} attempts)",
                        id,
                        attempts,
                        self.max_retries
                    );
                    report.retried.push(id);
                }
                Ok(FailureOutcome::Dropped(item)) => {
                    tracing::warn!(
                        "Dropping {} after {} failed attempts: {}",
                        item,
                        item.retry_count,
                        item.payload
                    );
                    report.dropped.push(id);
                }
                Ok(FailureOutcome::Missing) => {
                    tracing::debug!("Queue item {} left the queue during drain", id);
                }
                Err(e) => {
                    tracing::error!("Failed to record retry for {}: {}", id, e);
                    report.storage_faults += 1;
                }
            }
        }

        if report.attempted() > 0 {
            tracing::info!(
                "Drain finished: {} sent, {} retrying, {} dropped",
                report.sent.len(),
                report.retried.len(),
                report.dropped.len()
            );
        }

        report
    }

    /// Whether a drain is currently running.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Bumps the retry count of `id` in the current stored queue, dropping it
    /// once the cap is reached.
    fn record_failure(&self, id: &str) -> Result<FailureOutcome, StorageError> {
        let max_retries = self.max_retries;
        self.mutate(|items| {
            let Some(position) = items.iter().position(|item| item.id == id) else {
                return FailureOutcome::Missing;
            };

            items[position].retry_count += 1;
            let attempts = items[position].retry_count;

            if attempts >= max_retries {
                FailureOutcome::Dropped(items.remove(position))
            } else {
                FailureOutcome::Retrying(attempts)
            }
        })
    }

    /// Applies `change` to the stored queue and writes the result back.
    ///
    /// An unreadable queue aborts the change instead of being overwritten.
    fn mutate<R>(&self, change: impl FnOnce(&mut Vec<SyncQueueItem>) -> R) -> Result<R, StorageError> {
        let _lock = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut items: Vec<SyncQueueItem> = self.store.try_get(&self.key)?.unwrap_or_default();
        let result = change(&mut items);
        self.store.try_set(&self.key, &items)?;

        Ok(result)
    }
}

impl std::fmt::Debug for SyncQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncQueue")
            .field("key", &self.key)
            .field("max_retries", &self.max_retries)
            .field("draining", &self.is_draining())
            .finish_non_exhaustive()
    }
}

fn remove_by_id(items: &mut Vec<SyncQueueItem>, id: &str) -> Option<SyncQueueItem> {
    let position = items.iter().position(|item| item.id == id)?;
    Some(items.remove(position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::{MemoryMedium, StorageMedium};
    use chrono::{TimeZone, Utc};
    use futures::future::ready;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn test_queue() -> (SyncQueue, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 2, 1, 7, 30, 0).unwrap(),
        ));
        let queue = SyncQueue::new(PersistentStore::in_memory(), clock.clone());
        (queue, clock)
    }

    /// Memory medium whose writes can be switched off.
    #[derive(Default)]
    struct FlakyMedium {
        inner: MemoryMedium,
        fail_writes: AtomicBool,
    }

    impl StorageMedium for FlakyMedium {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get_item(key)
        }
        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("quota exceeded".to_string()));
            }
            self.inner.set_item(key, value)
        }
        fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove_item(key)
        }
        fn keys(&self) -> Result<Vec<String>, StorageError> {
            self.inner.keys()
        }
    }

    #[test]
    fn test_enqueue_then_peek() {
        let (queue, clock) = test_queue();

        let item = queue
            .enqueue(SyncKind::Meal, SyncAction::Create, &json!({ "id": "m1" }))
            .unwrap();
        let items = queue.peek_all();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0], item);
        assert_eq!(items[0].retry_count, 0);
        assert_eq!(items[0].enqueued_at, clock.now());
        assert!(items[0].id.starts_with("sync-"));
    }

    #[test]
    fn test_peek_preserves_fifo_order() {
        let (queue, _clock) = test_queue();
        for n in 0..5 {
            queue.enqueue(SyncKind::Symptom, SyncAction::Create, &json!({ "n": n }));
        }

        let order: Vec<i64> = queue
            .peek_all()
            .iter()
            .map(|item| item.payload["n"].as_i64().unwrap())
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_queue() {
        let (queue, _clock) = test_queue();
        assert!(queue.peek_all().is_empty());
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_remove_and_clear() {
        let (queue, _clock) = test_queue();
        let a = queue.enqueue(SyncKind::Meal, SyncAction::Create, &1).unwrap();
        queue.enqueue(SyncKind::Meal, SyncAction::Create, &2).unwrap();

        assert!(queue.remove(&a.id));
        assert!(!queue.remove(&a.id));
        assert_eq!(queue.len(), 1);

        assert!(queue.clear());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_successful_send_empties_queue() {
        let (queue, _clock) = test_queue();
        let item = queue.enqueue(SyncKind::Meal, SyncAction::Create, &json!({})).unwrap();

        let report = queue.drain(|_| ready(Ok::<_, String>(true))).await;

        assert!(queue.is_empty());
        assert_eq!(report.sent, vec![item.id]);
        assert!(!report.skipped);
    }

    #[tokio::test]
    async fn test_failing_send_drops_after_max_retries() {
        let (queue, _clock) = test_queue();
        let item = queue.enqueue(SyncKind::Meal, SyncAction::Update, &json!({})).unwrap();

        for pass in 1..=2u32 {
            let report = queue.drain(|_| ready(Ok::<_, String>(false))).await;
            assert_eq!(report.retried, vec![item.id.clone()]);

            let items = queue.peek_all();
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].retry_count, pass);
        }

        let report = queue.drain(|_| ready(Ok::<_, String>(false))).await;
        assert_eq!(report.dropped, vec![item.id]);
        assert!(queue.peek_all().is_empty());
    }

    #[tokio::test]
    async fn test_send_error_counts_as_failure() {
        let (queue, _clock) = test_queue();
        queue.enqueue(SyncKind::Pattern, SyncAction::Delete, &json!({})).unwrap();

        let report = queue
            .drain(|_| ready(Err::<bool, _>("connection reset".to_string())))
            .await;

        assert_eq!(report.retried.len(), 1);
        assert_eq!(queue.peek_all()[0].retry_count, 1);
    }

    #[tokio::test]
    async fn test_mixed_outcomes_keep_order() {
        let (queue, _clock) = test_queue();
        let a = queue.enqueue(SyncKind::Meal, SyncAction::Create, &json!({ "ok": true })).unwrap();
        let b = queue.enqueue(SyncKind::Meal, SyncAction::Create, &json!({ "ok": false })).unwrap();
        let c = queue.enqueue(SyncKind::Meal, SyncAction::Create, &json!({ "ok": true })).unwrap();

        let mut seen = Vec::new();
        let report = queue
            .drain(|item| {
                seen.push(item.id.clone());
                ready(Ok::<_, String>(item.payload["ok"] == true))
            })
            .await;

        assert_eq!(seen, vec![a.id.clone(), b.id.clone(), c.id.clone()]);
        assert_eq!(report.sent, vec![a.id, c.id]);
        assert_eq!(report.retried, vec![b.id.clone()]);
        assert_eq!(queue.peek_all().len(), 1);
        assert_eq!(queue.peek_all()[0].id, b.id);
    }

    #[tokio::test]
    async fn test_enqueue_during_drain_is_kept_for_next_pass() {
        let (queue, _clock) = test_queue();
        let queue = Arc::new(queue);
        let first = queue.enqueue(SyncKind::Meal, SyncAction::Create, &1).unwrap();

        let inner = Arc::clone(&queue);
        let mut late_id = None;
        let report = queue
            .drain(|_| {
                // A write arriving while the send is in flight.
                late_id = inner
                    .enqueue(SyncKind::Symptom, SyncAction::Create, &2)
                    .map(|item| item.id);
                ready(Ok::<_, String>(false))
            })
            .await;

        assert_eq!(report.attempted(), 1);
        let items = queue.peek_all();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, first.id);
        assert_eq!(items[0].retry_count, 1);
        assert_eq!(Some(items[1].id.clone()), late_id);
        assert_eq!(items[1].retry_count, 0);
    }

    #[tokio::test]
    async fn test_clear_during_drain_does_not_resurrect_items() {
        let (queue, _clock) = test_queue();
        let queue = Arc::new(queue);
        queue.enqueue(SyncKind::Meal, SyncAction::Create, &1).unwrap();
        queue.enqueue(SyncKind::Meal, SyncAction::Create, &2).unwrap();

        let inner = Arc::clone(&queue);
        let report = queue
            .drain(|_| {
                inner.clear();
                ready(Ok::<_, String>(false))
            })
            .await;

        assert!(report.retried.is_empty());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_item_cleared_before_removal_is_not_reported_sent() {
        let (queue, _clock) = test_queue();
        let queue = Arc::new(queue);
        queue.enqueue(SyncKind::Meal, SyncAction::Create, &1).unwrap();

        let inner = Arc::clone(&queue);
        let report = queue
            .drain(|_| {
                inner.clear();
                ready(Ok::<_, String>(true))
            })
            .await;

        assert!(report.sent.is_empty());
        assert_eq!(report.storage_faults, 0);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_drain_is_skipped() {
        let (queue, _clock) = test_queue();
        let queue = Arc::new(queue);
        queue.enqueue(SyncKind::Meal, SyncAction::Create, &1).unwrap();

        let release = Arc::new(Notify::new());
        let entered = Arc::new(Notify::new());
        let sends = Arc::new(AtomicUsize::new(0));

        let first = {
            let queue = Arc::clone(&queue);
            let release = Arc::clone(&release);
            let entered = Arc::clone(&entered);
            let sends = Arc::clone(&sends);
            tokio::spawn(async move {
                queue
                    .drain(|_| {
                        let release = Arc::clone(&release);
                        let entered = Arc::clone(&entered);
                        sends.fetch_add(1, Ordering::SeqCst);
                        async move {
                            entered.notify_one();
                            release.notified().await;
                            Ok::<_, String>(true)
                        }
                    })
                    .await
            })
        };

        entered.notified().await;
        assert!(queue.is_draining());

        let second = queue.drain(|_| ready(Ok::<_, String>(true))).await;
        assert!(second.skipped);
        assert_eq!(second.attempted(), 0);

        release.notify_one();
        let first = first.await.unwrap();
        assert_eq!(first.sent.len(), 1);
        assert_eq!(sends.load(Ordering::SeqCst), 1);
        assert!(!queue.is_draining());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_storage_fault_does_not_abort_drain() {
        let medium = Arc::new(FlakyMedium::default());
        let store = PersistentStore::new(medium.clone(), "gutwise");
        let queue = SyncQueue::new(store, Arc::new(ManualClock::default()));

        queue.enqueue(SyncKind::Meal, SyncAction::Create, &1).unwrap();
        queue.enqueue(SyncKind::Meal, SyncAction::Create, &2).unwrap();
        medium.fail_writes.store(true, Ordering::SeqCst);

        let mut calls = 0;
        let report = queue
            .drain(|_| {
                calls += 1;
                ready(Ok::<_, String>(true))
            })
            .await;

        assert_eq!(calls, 2);
        assert_eq!(report.storage_faults, 2);
        assert!(report.sent.is_empty());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_enqueue_reports_write_failure() {
        let medium = Arc::new(FlakyMedium::default());
        medium.fail_writes.store(true, Ordering::SeqCst);
        let store = PersistentStore::new(medium, "gutwise");
        let queue = SyncQueue::new(store, Arc::new(ManualClock::default()));

        assert!(queue.enqueue(SyncKind::Meal, SyncAction::Create, &1).is_none());
    }

    #[tokio::test]
    async fn test_custom_max_retries() {
        let clock = Arc::new(ManualClock::default());
        let queue = SyncQueue::new(PersistentStore::in_memory(), clock).with_max_retries(1);
        queue.enqueue(SyncKind::Meal, SyncAction::Create, &1).unwrap();

        let report = queue.drain(|_| ready(Ok::<_, String>(false))).await;
        assert_eq!(report.dropped.len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_unreadable_queue_is_not_overwritten() {
        let store = PersistentStore::in_memory();
        store.set("gutwise_sync_queue", &"not a queue");
        let queue = SyncQueue::new(store.clone(), Arc::new(ManualClock::default()));

        assert!(queue.enqueue(SyncKind::Meal, SyncAction::Create, &1).is_none());
        assert_eq!(
            store.get::<String>("gutwise_sync_queue"),
            Some("not a queue".to_string())
        );
    }
}
