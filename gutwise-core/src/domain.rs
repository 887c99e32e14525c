//! Collection-oriented CRUD over [`PersistentStore`].
//!
//! Each collection is one ordered JSON array stored under its own key.
//! Writes are local and immediate; pairing them with a queued mutation is
//! the caller's job.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::keys::StoreKey;
use crate::models::{Meal, Pattern, Product, Recipe, Symptom, UserPreferences};
use crate::storage::PersistentStore;

/// A record stored in a collection, addressed by its string id.
pub trait Record: Serialize + DeserializeOwned + Clone {
    fn id(&self) -> &str;
}

impl Record for Meal {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Symptom {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Pattern {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Recipe {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Product {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Local copies of the user's domain data.
#[derive(Debug, Clone)]
pub struct DomainStore {
    store: PersistentStore,
}

impl DomainStore {
    pub fn new(store: PersistentStore) -> Self {
        Self { store }
    }

    // Meals

    pub fn save_meal(&self, meal: &Meal) -> bool {
        self.append(StoreKey::Meals, meal)
    }

    pub fn list_meals(&self) -> Vec<Meal> {
        self.list(StoreKey::Meals)
    }

    pub fn get_meal(&self, id: &str) -> Option<Meal> {
        self.find(StoreKey::Meals, id)
    }

    /// Merges the fields of `patch` into the meal with `id`.
    pub fn update_meal(&self, id: &str, patch: &Value) -> bool {
        self.update::<Meal>(StoreKey::Meals, id, patch)
    }

    pub fn delete_meal(&self, id: &str) -> bool {
        self.delete::<Meal>(StoreKey::Meals, id)
    }

    // Symptoms

    pub fn save_symptom(&self, symptom: &Symptom) -> bool {
        self.append(StoreKey::Symptoms, symptom)
    }

    pub fn list_symptoms(&self) -> Vec<Symptom> {
        self.list(StoreKey::Symptoms)
    }

    pub fn get_symptom(&self, id: &str) -> Option<Symptom> {
        self.find(StoreKey::Symptoms, id)
    }

    pub fn update_symptom(&self, id: &str, patch: &Value) -> bool {
        self.update::<Symptom>(StoreKey::Symptoms, id, patch)
    }

    pub fn delete_symptom(&self, id: &str) -> bool {
        self.delete::<Symptom>(StoreKey::Symptoms, id)
    }

    // Patterns are computed remotely and replaced wholesale.

    pub fn save_patterns(&self, patterns: &[Pattern]) -> bool {
        self.store.set(&self.store.key(StoreKey::Patterns), patterns)
    }

    pub fn list_patterns(&self) -> Vec<Pattern> {
        self.list(StoreKey::Patterns)
    }

    pub fn update_pattern(&self, id: &str, patch: &Value) -> bool {
        self.update::<Pattern>(StoreKey::Patterns, id, patch)
    }

    pub fn delete_pattern(&self, id: &str) -> bool {
        self.delete::<Pattern>(StoreKey::Patterns, id)
    }

    // Saved recipes

    /// Bookmarks a recipe. Saving an already saved id is a successful no-op.
    pub fn save_recipe(&self, recipe: &Recipe) -> bool {
        self.append_unique(StoreKey::SavedRecipes, recipe)
    }

    pub fn unsave_recipe(&self, id: &str) -> bool {
        self.delete::<Recipe>(StoreKey::SavedRecipes, id)
    }

    pub fn list_saved_recipes(&self) -> Vec<Recipe> {
        self.list(StoreKey::SavedRecipes)
    }

    // Saved products

    /// Bookmarks a product. Saving an already saved id is a successful no-op.
    pub fn save_product(&self, product: &Product) -> bool {
        self.append_unique(StoreKey::SavedProducts, product)
    }

    pub fn unsave_product(&self, id: &str) -> bool {
        self.delete::<Product>(StoreKey::SavedProducts, id)
    }

    pub fn list_saved_products(&self) -> Vec<Product> {
        self.list(StoreKey::SavedProducts)
    }

    // Single values

    pub fn save_preferences(&self, preferences: &UserPreferences) -> bool {
        self.store
            .set(&self.store.key(StoreKey::Preferences), preferences)
    }

    /// Stored preferences, or the defaults if none were saved.
    pub fn preferences(&self) -> UserPreferences {
        self.store
            .get(&self.store.key(StoreKey::Preferences))
            .unwrap_or_default()
    }

    pub fn set_onboarded(&self, onboarded: bool) -> bool {
        self.store
            .set(&self.store.key(StoreKey::Onboarding), &onboarded)
    }

    pub fn is_onboarded(&self) -> bool {
        self.store
            .get(&self.store.key(StoreKey::Onboarding))
            .unwrap_or(false)
    }

    /// Removes every domain collection and value. The sync queue and cache
    /// are owned elsewhere and left alone.
    pub fn clear_all_data(&self) -> bool {
        let keys: Vec<String> = StoreKey::DOMAIN
            .iter()
            .map(|key| self.store.key(*key))
            .collect();
        self.store.clear(&keys)
    }

    fn list<T: Record>(&self, key: StoreKey) -> Vec<T> {
        self.store.get(&self.store.key(key)).unwrap_or_default()
    }

    fn find<T: Record>(&self, key: StoreKey, id: &str) -> Option<T> {
        self.list::<T>(key).into_iter().find(|r| r.id() == id)
    }

    /// Reads a collection that is about to be rewritten. An unreadable
    /// collection yields `None` so it is never overwritten.
    fn load_for_write<T: Record>(&self, key: StoreKey) -> Option<Vec<T>> {
        match self.store.try_get(&self.store.key(key)) {
            Ok(records) => Some(records.unwrap_or_default()),
            Err(e) => {
                tracing::error!("Refusing to rewrite unreadable {}: {}", key.suffix(), e);
                None
            }
        }
    }

    fn append<T: Record>(&self, key: StoreKey, record: &T) -> bool {
        let Some(mut records) = self.load_for_write::<T>(key) else {
            return false;
        };
        records.push(record.clone());
        self.store.set(&self.store.key(key), &records)
    }

    fn append_unique<T: Record>(&self, key: StoreKey, record: &T) -> bool {
        let Some(mut records) = self.load_for_write::<T>(key) else {
            return false;
        };
        if records.iter().any(|r| r.id() == record.id()) {
            return true;
        }
        records.push(record.clone());
        self.store.set(&self.store.key(key), &records)
    }

    fn update<T: Record>(&self, key: StoreKey, id: &str, patch: &Value) -> bool {
        let Value::Object(fields) = patch else {
            tracing::warn!("Rejected non-object patch for {} '{}'", key.suffix(), id);
            return false;
        };

        let Some(mut records) = self.load_for_write::<T>(key) else {
            return false;
        };
        let Some(index) = records.iter().position(|r| r.id() == id) else {
            return false;
        };

        let mut merged = match serde_json::to_value(&records[index]) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => return false,
        };
        for (field, value) in fields {
            // The id addresses the record and is never rewritten by a patch.
            if field != "id" {
                merged.insert(field.clone(), value.clone());
            }
        }

        match serde_json::from_value::<T>(Value::Object(merged)) {
            Ok(updated) => records[index] = updated,
            Err(e) => {
                tracing::warn!("Rejected patch for {} '{}': {}", key.suffix(), id, e);
                return false;
            }
        }

        self.store.set(&self.store.key(key), &records)
    }

    fn delete<T: Record>(&self, key: StoreKey, id: &str) -> bool {
        let Some(mut records) = self.load_for_write::<T>(key) else {
            return false;
        };
        let before = records.len();
        records.retain(|r| r.id() != id);

        if records.len() == before {
            return false;
        }
        self.store.set(&self.store.key(key), &records)
    }
}
