//! Fan-in of all change sources into a single invalidation callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use tokio::task::JoinHandle;

use super::channels::Subscription;
use super::sources::{ChangeSource, InvalidationCallback};
use super::ChangeEvent;

/// Subscribes to every configured [`ChangeSource`].
///
/// A source that fails to connect is logged and skipped; the others keep
/// working. Channel health is never reported as an error.
#[derive(Clone, Default)]
pub struct ChangeNotificationHub {
    sources: Vec<Arc<dyn ChangeSource>>,
}

impl ChangeNotificationHub {
    pub fn new(sources: Vec<Arc<dyn ChangeSource>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Starts deferred setup of every source and returns the handle that
    /// releases them. Must be called from within a Tokio runtime.
    pub fn subscribe<F>(&self, on_invalidate: F) -> HubSubscription
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        let state = Arc::new(HubState::default());

        // Late deliveries after unsubscribe are dropped here, whatever the
        // collaborator does with its own registration.
        let gate = Arc::downgrade(&state);
        let callback: InvalidationCallback = Arc::new(move |event| {
            let open = gate
                .upgrade()
                .map(|s| !s.closed.load(Ordering::SeqCst))
                .unwrap_or(false);
            if open {
                on_invalidate(event);
            }
        });

        let mut tasks = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let source = Arc::clone(source);
            let callback = Arc::clone(&callback);
            let state = Arc::clone(&state);
            tasks.push(tokio::spawn(async move {
                connect_source(source, callback, state).await;
            }));
        }

        *state.setup_tasks.lock().unwrap_or_else(|e| e.into_inner()) = tasks;
        HubSubscription { state }
    }
}

async fn connect_source(
    source: Arc<dyn ChangeSource>,
    callback: InvalidationCallback,
    state: Arc<HubState>,
) {
    let delay = source.setup_delay();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if state.closed.load(Ordering::SeqCst) {
        return;
    }

    match source.connect(callback).await {
        Ok(Some(subscription)) => {
            let mut channels = state.channels.lock().unwrap_or_else(|e| e.into_inner());
            if state.closed.load(Ordering::SeqCst) {
                drop(channels);
                subscription.unsubscribe();
                debug!("Released {} subscription established after teardown", source.name());
                return;
            }
            info!("Subscribed to {}", source.name());
            channels.push((source.name().to_string(), subscription));
        }
        Ok(None) => debug!("{} skipped", source.name()),
        Err(e) => warn!("{} unavailable, relying on other channels: {}", source.name(), e),
    }
}

#[derive(Default)]
struct HubState {
    closed: AtomicBool,
    setup_tasks: Mutex<Vec<JoinHandle<()>>>,
    channels: Mutex<Vec<(String, Subscription)>>,
}

/// Releases every channel of a hub subscription. Idempotent; also runs on drop.
pub struct HubSubscription {
    state: Arc<HubState>,
}

impl HubSubscription {
    pub fn unsubscribe(&self) {
        if self.state.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let tasks = std::mem::take(
            &mut *self
                .state
                .setup_tasks
                .lock()
                .unwrap_or_else(|e| e.into_inner()),
        );
        for task in tasks {
            task.abort();
        }

        let channels = std::mem::take(
            &mut *self
                .state
                .channels
                .lock()
                .unwrap_or_else(|e| e.into_inner()),
        );
        for (name, subscription) in channels {
            subscription.unsubscribe();
            debug!("Unsubscribed from {}", name);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Names of the channels that are currently subscribed.
    pub fn active_channels(&self) -> Vec<String> {
        self.state
            .channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl Drop for HubSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
