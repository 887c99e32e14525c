//! Queue delivery for CLI commands.
//!
//! Provides the HTTP send function used to drain the queue, and automatic
//! draining after write operations when `auto_sync` is enabled.

use std::time::Duration;

use gutwise_core::{DrainReport, SyncQueue};

use crate::api::ApiClient;
use crate::config::Config;
use crate::context::AppContext;

/// Reachability check used before an automatic drain.
const AUTO_SYNC_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Drains `queue` through `client`.
pub async fn drain_queue(queue: &SyncQueue, client: &ApiClient) -> DrainReport {
    queue
        .drain(|item| async move { client.send_item(&item).await })
        .await
}

/// Drains the queue if auto-sync is enabled and the server is reachable.
///
/// This function:
/// 1. Checks if auto_sync is enabled in config
/// 2. Checks if sync is configured (api_url present)
/// 3. Probes the server and records the result on the monitor
/// 4. Drains the queue
///
/// Nothing here fails the command: the CLI keeps working offline and the
/// queue simply waits for the next sync.
pub async fn try_auto_sync(config: &Config, ctx: &AppContext) {
    if !config.sync.auto_sync || ctx.queue.is_empty() {
        return;
    }

    let client = match ApiClient::from_config(&config.sync) {
        Ok(client) => client,
        Err(_) => return,
    };

    let online = client.check_server(AUTO_SYNC_PROBE_TIMEOUT).await;
    ctx.monitor.set_online(online);
    if !online {
        eprintln!("Auto-sync: server unreachable, {} change(s) queued", ctx.queue.len());
        return;
    }

    let report = drain_queue(&ctx.queue, &client).await;
    if !report.retried.is_empty() || !report.dropped.is_empty() {
        eprintln!(
            "Auto-sync: {} sent, {} will retry, {} dropped",
            report.sent.len(),
            report.retried.len(),
            report.dropped.len()
        );
    }
}
