//! Offline mutation queue.
//!
//! Writes made while offline are appended here and delivered later by
//! [`SyncQueue::drain`] through a caller-supplied send function.
//!
//! ## Item lifecycle
//!
//! 1. `enqueue` appends an item with `retryCount = 0`
//! 2. Each drain hands the item to `send`
//! 3. Delivered items are removed
//! 4. Failed items have `retryCount` bumped and stay queued
//! 5. An item whose `retryCount` reaches the cap is dropped and logged

mod item;
mod sync_queue;

pub use item::{generate_item_id, SyncAction, SyncKind, SyncQueueItem};
pub use sync_queue::{DrainReport, SyncQueue, DEFAULT_MAX_RETRIES};
