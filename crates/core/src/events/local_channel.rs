//! In-process implementation of [`EventChannel`].

use std::sync::{Arc, Mutex, Weak};

use log::debug;

use super::channels::{EventChannel, PayloadCallback, Subscription};
use crate::errors::Result;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, String, PayloadCallback)>,
}

/// Same-process publish/subscribe bus.
///
/// Listeners run synchronously on the publishing thread, outside the registry
/// lock, so a listener may publish or unsubscribe without deadlocking.
#[derive(Clone, Default)]
pub struct LocalEventChannel {
    registry: Arc<Mutex<Registry>>,
}

impl LocalEventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `payload` to every listener of `event_name`. Returns the
    /// number of listeners reached.
    pub fn publish(&self, event_name: &str, payload: serde_json::Value) -> usize {
        let targets: Vec<PayloadCallback> = {
            let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            registry
                .listeners
                .iter()
                .filter(|(_, name, _)| name == event_name)
                .map(|(_, _, callback)| callback.clone())
                .collect()
        };

        for callback in &targets {
            callback(payload.clone());
        }
        targets.len()
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .listeners
            .iter()
            .filter(|(_, name, _)| name == event_name)
            .count()
    }
}

impl EventChannel for LocalEventChannel {
    fn listen(&self, event_name: &str, on_event: PayloadCallback) -> Result<Subscription> {
        let id = {
            let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            registry.next_id += 1;
            let id = registry.next_id;
            registry
                .listeners
                .push((id, event_name.to_string(), on_event));
            id
        };

        let weak: Weak<Mutex<Registry>> = Arc::downgrade(&self.registry);
        let label = format!("local:{}", event_name);
        Ok(Subscription::new(label, move || {
            if let Some(registry) = weak.upgrade() {
                let mut registry = registry.lock().unwrap_or_else(|e| e.into_inner());
                registry.listeners.retain(|(listener_id, _, _)| *listener_id != id);
                debug!("Removed local listener {}", id);
            }
        }))
    }
}
