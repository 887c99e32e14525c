//! Best-effort persistent key/value storage.
//!
//! A [`StorageMedium`] holds raw text per key. [`PersistentStore`] layers
//! JSON encoding on top and never surfaces a failure to its caller: every
//! error is logged and turned into `false` or `None`.
//!
//! # Media
//!
//! - [`FileMedium`]: one `<key>.json` file per key in a data directory
//! - [`MemoryMedium`]: process-local map, used for tests and throwaway sessions

mod error;
mod medium;
mod store;

pub use error::StorageError;
pub use medium::{FileMedium, MemoryMedium, StorageMedium};
pub use store::PersistentStore;
