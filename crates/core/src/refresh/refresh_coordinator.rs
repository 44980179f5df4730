//! Owner of the balance cache and its refresh cycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::sync::{watch, Notify};

use super::debounce::DebounceTimer;
use super::refresh_model::{RefreshPhase, RefreshState};
use crate::balances::{AccountBalance, BalanceCache, BalanceStoreTrait};
use crate::classifier::ErrorClassifier;
use crate::config::EngineConfig;
use crate::errors::{Error, Result};
use crate::events::InvalidationSource;
use crate::identity::IdentityProviderTrait;

#[derive(Debug, Default)]
struct FlightState {
    in_flight: bool,
    trailing: bool,
    /// Sequence number of the last fetch started.
    started: u64,
    /// Sequence number of the last fetch that ran to completion.
    completed: u64,
}

struct CoordinatorInner {
    store: Arc<dyn BalanceStoreTrait>,
    identity: Arc<dyn IdentityProviderTrait>,
    cache: Arc<BalanceCache>,
    classifier: ErrorClassifier,
    config: EngineConfig,
    state: RwLock<RefreshState>,
    flight: Mutex<FlightState>,
    idle: Notify,
    debounce: DebounceTimer,
    alive: AtomicBool,
    fetches: AtomicU64,
    revision: watch::Sender<u64>,
}

/// Keeps the [`BalanceCache`] in line with the store.
///
/// - At most one fetch runs at a time. A `refresh` issued while a fetch is
///   running queues exactly one trailing fetch and waits for it.
/// - `invalidate` debounces change signals with a per-source quiet period.
/// - Failures never escape `refresh`; they are classified and recorded in
///   [`RefreshState`].
///
/// Cloning is cheap and every clone drives the same cache.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn BalanceStoreTrait>,
        identity: Arc<dyn IdentityProviderTrait>,
        config: EngineConfig,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(CoordinatorInner {
                store,
                identity,
                cache: Arc::new(BalanceCache::new()),
                classifier: ErrorClassifier::new(config.verbose_errors),
                config,
                state: RwLock::new(RefreshState::default()),
                flight: Mutex::new(FlightState::default()),
                idle: Notify::new(),
                debounce: DebounceTimer::new(),
                alive: AtomicBool::new(true),
                fetches: AtomicU64::new(0),
                revision,
            }),
        }
    }

    pub fn cache(&self) -> Arc<BalanceCache> {
        Arc::clone(&self.inner.cache)
    }

    pub fn state(&self) -> RefreshState {
        self.inner
            .state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn phase(&self) -> RefreshPhase {
        let flight = self.inner.flight.lock().unwrap_or_else(|e| e.into_inner());
        match (flight.in_flight, flight.trailing) {
            (false, _) => RefreshPhase::Idle,
            (true, false) => RefreshPhase::Fetching,
            (true, true) => RefreshPhase::FetchingAgain,
        }
    }

    /// Number of store queries issued so far.
    pub fn fetch_count(&self) -> u64 {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::SeqCst)
    }

    /// Revision counter bumped after every state or cache change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Reloads balances from the store. Never fails; see [`RefreshState`].
    ///
    /// A caller that finds a fetch in flight waits for a fetch that starts
    /// after it queued. If the running leader is cancelled, a waiter takes
    /// over and runs that fetch itself.
    pub async fn refresh(&self) {
        if !self.is_alive() {
            return;
        }
        self.inner.debounce.bind_current();

        let mut target: Option<u64> = None;
        loop {
            // The waiter is registered under the lock so the leader cannot go
            // idle between our check and the wait.
            let waiter = {
                let mut flight = self.inner.flight.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(target) = target {
                    if flight.completed >= target || !self.is_alive() {
                        return;
                    }
                }
                if flight.in_flight {
                    flight.trailing = true;
                    target.get_or_insert(flight.started + 1);
                    let mut notified = Box::pin(self.inner.idle.notified());
                    notified.as_mut().enable();
                    Some(notified)
                } else {
                    flight.in_flight = true;
                    flight.started += 1;
                    None
                }
            };
            match waiter {
                Some(notified) => {
                    debug!("Refresh already in flight, queued a trailing refresh");
                    notified.await;
                }
                None => break,
            }
        }

        self.lead().await;
    }

    /// Runs fetches until no trailing request is left. The caller must have
    /// claimed `in_flight` and numbered the first fetch.
    async fn lead(&self) {
        let mut guard = FlightGuard {
            inner: &self.inner,
            armed: true,
        };

        loop {
            self.inner.fetch_once().await;

            let mut flight = self.inner.flight.lock().unwrap_or_else(|e| e.into_inner());
            flight.completed = flight.started;
            if flight.trailing && self.is_alive() {
                flight.trailing = false;
                flight.started += 1;
                debug!("Running coalesced trailing refresh");
                continue;
            }
            flight.in_flight = false;
            flight.trailing = false;
            guard.armed = false;
            break;
        }

        self.inner.idle.notify_waiters();
    }

    /// Schedules a debounced refresh for a change coming from `source`.
    pub fn invalidate(&self, source: InvalidationSource) {
        if !self.is_alive() {
            return;
        }
        let delay = self.inner.config.debounce_for(source);
        debug!("Invalidation from {:?}, refreshing in {:?}", source, delay);

        let weak: Weak<CoordinatorInner> = Arc::downgrade(&self.inner);
        self.inner.debounce.schedule(delay, move || async move {
            if let Some(inner) = weak.upgrade() {
                RefreshCoordinator { inner }.refresh().await;
            }
        });
    }

    /// Stops all future work. Idempotent.
    ///
    /// A fetch already in flight is allowed to finish but its result is
    /// dropped; the cache is never written after this returns.
    pub fn dispose(&self) {
        if !self.inner.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        if self.inner.debounce.cancel() {
            debug!("Cancelled pending debounced refresh");
        }
        info!("Refresh coordinator disposed");
    }
}

/// Releases the in-flight marker if a refresh future is dropped mid-fetch.
/// Queued waiters wake up and one of them takes over the trailing fetch.
struct FlightGuard<'a> {
    inner: &'a CoordinatorInner,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        {
            let mut flight = self.inner.flight.lock().unwrap_or_else(|e| e.into_inner());
            flight.in_flight = false;
            flight.trailing = false;
        }
        debug!("Refresh cancelled mid-fetch");
        self.inner.update_state(|s| s.loading = false);
        self.inner.idle.notify_waiters();
    }
}

impl CoordinatorInner {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    fn update_state<F>(&self, f: F)
    where
        F: FnOnce(&mut RefreshState),
    {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            f(&mut state);
        }
        self.bump_revision();
    }

    async fn fetch_once(&self) {
        self.update_state(|s| s.loading = true);
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let result = self.load_balances().await;

        if !self.is_alive() {
            debug!("Discarding refresh result, coordinator was disposed");
            self.update_state(|s| s.loading = false);
            return;
        }

        match result {
            Ok(balances) => {
                debug!("Fetched {} account balance(s)", balances.len());
                self.cache.replace_all(balances);
                self.update_state(|s| {
                    s.loading = false;
                    s.error = None;
                    s.has_loaded = true;
                    s.last_refreshed_at = Some(Utc::now());
                });
            }
            Err(err) => self.record_failure(err),
        }
    }

    async fn load_balances(&self) -> Result<Vec<AccountBalance>> {
        if self.identity.current_user().await?.is_none() {
            return Err(Error::Auth("no signed-in user".to_string()));
        }
        let demo = self.identity.is_demo_mode();
        self.store.query_balances(demo).await
    }

    fn record_failure(&self, err: Error) {
        let classified = self.classifier.classify(&err);

        if classified.kind.is_transient() {
            // Last known good data stays in place.
            if classified.suppress {
                debug!("Suppressed {:?} failure during refresh: {}", classified.kind, err);
                self.update_state(|s| s.loading = false);
            } else {
                warn!("{:?} failure during refresh: {}", classified.kind, err);
                self.update_state(|s| {
                    s.loading = false;
                    s.error = Some(classified);
                });
            }
            return;
        }

        error!("Balance refresh failed ({:?}): {}", classified.kind, err);
        let never_loaded = !self
            .state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .has_loaded;
        if never_loaded {
            self.cache.replace_all(Vec::new());
        }
        self.update_state(|s| {
            s.loading = false;
            s.error = Some(classified);
        });
    }
}
