//! Cancellable debounce timer.

use std::future::Future;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use log::warn;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

struct Pending {
    handle: JoinHandle<()>,
    deadline: Instant,
}

/// Runs an action once signals stop arriving for a quiet period.
///
/// Each `schedule` replaces the pending action. The new deadline is never
/// earlier than the one already pending, so a short-delay signal cannot cut
/// short the settle time requested by a long-delay one.
///
/// Aborting only ever hits the sleep: once the deadline passes the action is
/// spawned as its own task and runs to completion.
///
/// The timer remembers the runtime it was created or first used on, so
/// `schedule` also works from threads outside that runtime.
#[derive(Default)]
pub struct DebounceTimer {
    pending: Mutex<Option<Pending>>,
    runtime: OnceLock<Handle>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        let timer = Self::default();
        timer.bind_current();
        timer
    }

    /// Remembers the current runtime if none is bound yet.
    pub fn bind_current(&self) {
        if self.runtime.get().is_none() {
            if let Ok(handle) = Handle::try_current() {
                let _ = self.runtime.set(handle);
            }
        }
    }

    pub fn is_bound(&self) -> bool {
        self.runtime.get().is_some()
    }

    /// Replaces the pending action. Without a current or bound runtime the
    /// action is dropped and logged.
    pub fn schedule<F, Fut>(&self, delay: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.bind_current();
        let Some(runtime) = self.runtime.get() else {
            warn!("No Tokio runtime available, dropping debounced action");
            return;
        };
        let _context = runtime.enter();

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());

        let mut deadline = Instant::now() + delay;
        if let Some(previous) = pending.take() {
            if !previous.handle.is_finished() {
                deadline = deadline.max(previous.deadline);
            }
            previous.handle.abort();
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            tokio::spawn(action());
        });
        *pending = Some(Pending { handle, deadline });
    }

    /// Drops the pending action, if any. Returns true when one was cancelled.
    pub fn cancel(&self) -> bool {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match pending {
            Some(p) if !p.handle.is_finished() => {
                p.handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|p| !p.handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
