//! Feeds backend reachability into a [`ConnectivityMonitor`].

use std::time::Duration;

use gutwise_core::ConnectivityMonitor;
use tokio::task::JoinHandle;

use super::ApiClient;

/// Probes the health endpoint every `interval` and records the result with
/// `monitor.set_online`. Runs until the returned handle is aborted.
pub fn spawn_probe(
    client: ApiClient,
    monitor: ConnectivityMonitor,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let online = client.check_server(interval).await;
            monitor.set_online(online);
        }
    })
}
