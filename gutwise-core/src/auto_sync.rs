//! Drains the sync queue whenever connectivity returns, and optionally on
//! a fixed schedule while it stays up.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{self, Interval, MissedTickBehavior};
use tokio::task::JoinHandle;

use crate::connectivity::{ConnectivityMonitor, Subscription};
use crate::queue::{SyncQueue, SyncQueueItem};

/// Background drain loop bound to a [`ConnectivityMonitor`].
///
/// Dropping the handle unsubscribes from the monitor and stops the loop.
#[must_use = "dropping AutoDrain stops automatic draining"]
#[derive(Debug)]
pub struct AutoDrain {
    _subscription: Subscription,
    task: JoinHandle<()>,
}

impl AutoDrain {
    /// Stops the loop. Equivalent to dropping the handle.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for AutoDrain {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns a task that drains `queue` through `send` each time `monitor`
/// transitions to online, and once immediately if it already is.
///
/// Must be called from within a tokio runtime.
pub fn spawn_auto_drain<F, Fut, E>(
    queue: Arc<SyncQueue>,
    monitor: &ConnectivityMonitor,
    send: F,
) -> AutoDrain
where
    F: Fn(SyncQueueItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    spawn_drain_loop(queue, monitor, None, send)
}

/// Like [`spawn_auto_drain`], but also drains every `retry_every` while the
/// monitor reports online and the queue is non-empty. This picks up items
/// left behind by a failed pass or queued by another process without
/// waiting for connectivity to flap.
pub fn spawn_auto_drain_with_retry<F, Fut, E>(
    queue: Arc<SyncQueue>,
    monitor: &ConnectivityMonitor,
    retry_every: Duration,
    send: F,
) -> AutoDrain
where
    F: Fn(SyncQueueItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    spawn_drain_loop(queue, monitor, Some(retry_every), send)
}

fn spawn_drain_loop<F, Fut, E>(
    queue: Arc<SyncQueue>,
    monitor: &ConnectivityMonitor,
    retry_every: Option<Duration>,
    send: F,
) -> AutoDrain
where
    F: Fn(SyncQueueItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let wake = Arc::new(Notify::new());

    let listener_wake = Arc::clone(&wake);
    let subscription = monitor.subscribe(move |online| {
        if online {
            listener_wake.notify_one();
        }
    });

    if monitor.is_online() {
        wake.notify_one();
    }

    let monitor = monitor.clone();
    let task = tokio::spawn(async move {
        let mut ticker = retry_every.map(|every| {
            let mut ticker = time::interval_at(time::Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                _ = wake.notified() => {}
                _ = next_tick(&mut ticker) => {
                    if !monitor.is_online() || queue.is_empty() {
                        continue;
                    }
                }
            }

            let report = queue.drain(&send).await;
            if report.skipped {
                tracing::debug!("Auto drain skipped, another drain is running");
            }
        }
    });

    AutoDrain {
        _subscription: subscription,
        task,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
