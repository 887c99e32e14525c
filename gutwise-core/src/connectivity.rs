//! Online/offline state tracking.
//!
//! The platform feeds connectivity changes in through
//! [`ConnectivityMonitor::set_online`]; consumers read the current state,
//! subscribe to transitions, or wait for the next reconnect with a timeout.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::oneshot;

/// Default time [`ConnectivityMonitor::wait_for_connection`] callers wait.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

struct Inner {
    online: AtomicBool,
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

/// Tracks whether the client is online and notifies on transitions.
///
/// Cheap to clone; clones share state and listeners.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                online: AtomicBool::new(initially_online),
                next_id: AtomicU64::new(0),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns the current connectivity state.
    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Records the platform's connectivity state.
    ///
    /// Listeners run only when the state actually changes, on the calling
    /// thread, after the listener registry lock has been released. Returns
    /// whether this call was a transition.
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.inner.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return false;
        }

        if online {
            tracing::info!("Connectivity: online");
        } else {
            tracing::info!("Connectivity: offline");
        }

        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(online);
        }

        true
    }

    /// Registers `callback` for both "became online" (`true`) and "became
    /// offline" (`false`) transitions.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));

        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Resolves `true` as soon as the client is online, or `false` once
    /// `timeout` elapses first.
    ///
    /// The internal listener is removed on both outcomes; a reconnect after
    /// the timeout has no effect.
    pub async fn wait_for_connection(&self, timeout: Duration) -> bool {
        let (tx, rx) = oneshot::channel::<()>();
        let tx = Mutex::new(Some(tx));

        // Subscribe before checking the state so a reconnect in between is not missed.
        let subscription = self.subscribe(move |online| {
            if !online {
                return;
            }
            if let Some(tx) = tx.lock().unwrap_or_else(PoisonError::into_inner).take() {
                let _ = tx.send(());
            }
        });

        if self.is_online() {
            return true;
        }

        let connected = matches!(tokio::time::timeout(timeout, rx).await, Ok(Ok(())));
        subscription.unsubscribe();

        if !connected {
            tracing::debug!("Gave up waiting for connection after {:?}", timeout);
        }
        connected
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("online", &self.is_online())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle to a registered connectivity listener.
///
/// Dropping the handle removes the listener.
#[must_use = "dropping a Subscription immediately removes its listener"]
pub struct Subscription {
    inner: Weak<Inner>,
    id: u64,
}

impl Subscription {
    /// Removes this listener, and only this listener.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
