//! Persisted key layout.
//!
//! Every value lives under `<namespace>_<suffix>`. Cache entries use the
//! reserved `<namespace>_cache_` prefix followed by the caller's key.

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "gutwise";

/// Suffix reserved for cache entries.
pub const CACHE_SUFFIX: &str = "cache_";

/// Well-known keys owned by the domain store and the sync queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Meals,
    Symptoms,
    Patterns,
    SavedRecipes,
    SavedProducts,
    Preferences,
    Onboarding,
    SyncQueue,
}

impl StoreKey {
    /// Keys cleared by a full data reset (everything except the queue).
    pub const DOMAIN: [StoreKey; 7] = [
        StoreKey::Meals,
        StoreKey::Symptoms,
        StoreKey::Patterns,
        StoreKey::SavedRecipes,
        StoreKey::SavedProducts,
        StoreKey::Preferences,
        StoreKey::Onboarding,
    ];

    /// Returns the suffix appended to the namespace for this key.
    pub fn suffix(&self) -> &'static str {
        match self {
            StoreKey::Meals => "meals",
            StoreKey::Symptoms => "symptoms",
            StoreKey::Patterns => "patterns",
            StoreKey::SavedRecipes => "saved_recipes",
            StoreKey::SavedProducts => "saved_products",
            StoreKey::Preferences => "preferences",
            StoreKey::Onboarding => "onboarding",
            StoreKey::SyncQueue => "sync_queue",
        }
    }
}

/// Joins a namespace and a suffix into a storage key.
pub fn namespaced(namespace: &str, suffix: &str) -> String {
    format!("{}_{}", namespace, suffix)
}
