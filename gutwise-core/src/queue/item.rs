//! Pending mutation records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Alphabet for the random suffix of generated ids.
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
/// Length of the random suffix of generated ids.
const ID_SUFFIX_LEN: usize = 9;

/// Which collection a queued mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    Meal,
    Symptom,
    Pattern,
}

impl SyncKind {
    /// Remote collection path segment for this kind.
    pub fn collection(&self) -> &'static str {
        match self {
            SyncKind::Meal => "meals",
            SyncKind::Symptom => "symptoms",
            SyncKind::Pattern => "patterns",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncKind::Meal => write!(f, "meal"),
            SyncKind::Symptom => write!(f, "symptom"),
            SyncKind::Pattern => write!(f, "pattern"),
        }
    }
}

impl FromStr for SyncKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "meal" => Ok(SyncKind::Meal),
            "symptom" => Ok(SyncKind::Symptom),
            "pattern" => Ok(SyncKind::Pattern),
            _ => Err(format!(
                "Invalid sync kind '{}'. Valid options: meal, symptom, pattern",
                s
            )),
        }
    }
}

/// The mutation a queued item carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::Create => write!(f, "create"),
            SyncAction::Update => write!(f, "update"),
            SyncAction::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for SyncAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(SyncAction::Create),
            "update" => Ok(SyncAction::Update),
            "delete" => Ok(SyncAction::Delete),
            _ => Err(format!(
                "Invalid sync action '{}'. Valid options: create, update, delete",
                s
            )),
        }
    }
}

/// A mutation waiting to be delivered to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueItem {
    pub id: String,
    pub kind: SyncKind,
    pub action: SyncAction,
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
    pub retry_count: u32,
}

impl SyncQueueItem {
    pub fn new(
        kind: SyncKind,
        action: SyncAction,
        payload: serde_json::Value,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_item_id(enqueued_at),
            kind,
            action,
            payload,
            enqueued_at,
            retry_count: 0,
        }
    }

    /// The `id` field of the payload, when the payload is a record.
    pub fn record_id(&self) -> Option<&str> {
        self.payload.get("id").and_then(|v| v.as_str())
    }
}

impl fmt::Display for SyncQueueItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.id, self.action, self.kind)?;
        if let Some(record_id) = self.record_id() {
            write!(f, " {}", record_id)?;
        }
        if self.retry_count > 0 {
            write!(f, " (retry {})", self.retry_count)?;
        }
        Ok(())
    }
}

/// Generates `sync-<epoch millis>-<9 random base36 chars>`.
pub fn generate_item_id(at: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("sync-{}-{}", at.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::HashSet;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_new_item_starts_without_retries() {
        let item = SyncQueueItem::new(SyncKind::Meal, SyncAction::Create, json!({}), at());
        assert_eq!(item.retry_count, 0);
        assert_eq!(item.enqueued_at, at());
    }

    #[test]
    fn test_generated_id_format() {
        let id = generate_item_id(at());
        let parts: Vec<&str> = id.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "sync");
        assert_eq!(parts[1], at().timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<String> = (0..500).map(|_| generate_item_id(at())).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_record_id() {
        let item = SyncQueueItem::new(
            SyncKind::Symptom,
            SyncAction::Delete,
            json!({ "id": "s-1" }),
            at(),
        );
        assert_eq!(item.record_id(), Some("s-1"));

        let bare = SyncQueueItem::new(SyncKind::Symptom, SyncAction::Create, json!(5), at());
        assert_eq!(bare.record_id(), None);
    }

    #[test]
    fn test_wire_format() {
        let item = SyncQueueItem::new(
            SyncKind::Pattern,
            SyncAction::Update,
            json!({ "id": "p-1" }),
            at(),
        );
        let value = serde_json::to_value(&item).unwrap();

        assert_eq!(value["kind"], "pattern");
        assert_eq!(value["action"], "update");
        assert_eq!(value["enqueuedAt"], "2025-01-01T00:00:00Z");
        assert_eq!(value["retryCount"], 0);
    }

    #[test]
    fn test_kind_and_action_from_str() {
        assert_eq!("MEAL".parse::<SyncKind>().unwrap(), SyncKind::Meal);
        assert_eq!("delete".parse::<SyncAction>().unwrap(), SyncAction::Delete);
        assert!("recipe".parse::<SyncKind>().is_err());
        assert!("upsert".parse::<SyncAction>().is_err());
    }

    #[test]
    fn test_collection() {
        assert_eq!(SyncKind::Meal.collection(), "meals");
        assert_eq!(SyncKind::Symptom.collection(), "symptoms");
        assert_eq!(SyncKind::Pattern.collection(), "patterns");
    }
}
