//! Collaborator channel traits and the subscription handle they return.

use std::fmt;
use std::sync::{Arc, Mutex};

use super::{ChangeTable, TableChange};
use crate::errors::Result;

/// Callback invoked for every row change delivered by a table feed.
pub type TableChangeCallback = Arc<dyn Fn(TableChange) + Send + Sync>;

/// Callback invoked with the opaque payload of a bus or emitter event.
pub type PayloadCallback = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Handle for an active registration on a collaborator channel.
///
/// Releasing is idempotent and also happens on drop.
pub struct Subscription {
    label: String,
    release: Mutex<Option<ReleaseFn>>,
}

impl Subscription {
    pub fn new<F>(label: impl Into<String>, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            label: label.into(),
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_active(&self) -> bool {
        self.release
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    pub fn unsubscribe(&self) {
        let release = match self.release.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(release) = release {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Push-based change feed of the backing store.
///
/// Delivery is at-least-once and unordered, and a feed may never fire at all.
/// Nothing in the engine relies on it firing.
pub trait ChangeFeed: Send + Sync {
    fn subscribe_table_changes(
        &self,
        table: ChangeTable,
        user_id: &str,
        on_change: TableChangeCallback,
    ) -> Result<Subscription>;
}

/// Publish/subscribe channel keyed by event name.
pub trait EventChannel: Send + Sync {
    fn listen(&self, event_name: &str, on_event: PayloadCallback) -> Result<Subscription>;
}
