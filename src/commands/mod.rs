mod cache_cmd;
mod config_cmd;
mod meal;
mod pattern;
mod reset;
mod symptom;
mod sync_cmd;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use clap::ValueEnum;
use serde::Serialize;

use gutwise_core::{SyncAction, SyncKind};

use crate::context::AppContext;

pub use cache_cmd::CacheCommand;
pub use config_cmd::ConfigCommand;
pub use meal::MealCommand;
pub use pattern::PatternCommand;
pub use reset::ResetCommand;
pub use symptom::SymptomCommand;
pub use sync_cmd::SyncCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parses an RFC 3339 timestamp or a local `YYYY-MM-DD HH:MM`.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").map_err(|_| {
        format!(
            "Invalid time '{}'. Use YYYY-MM-DD HH:MM or RFC 3339.",
            s
        )
    })?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(|| format!("Time '{}' does not exist in the local timezone", s))
}

/// Records a local change for delivery. A change that cannot be queued is
/// still saved locally, so this only warns.
fn queue_change<T: Serialize + ?Sized>(
    ctx: &AppContext,
    kind: SyncKind,
    action: SyncAction,
    payload: &T,
) {
    if ctx.queue.enqueue(kind, action, payload).is_none() {
        eprintln!("Warning: saved locally but could not queue {} {} for sync", action, kind);
    }
}
