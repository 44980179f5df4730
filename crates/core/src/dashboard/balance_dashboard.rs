use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info};
use rust_decimal::Decimal;
use tokio::sync::watch;

use crate::balances::{AccountBalance, BalanceStoreTrait};
use crate::config::EngineConfig;
use crate::events::{
    ChangeFeed, ChangeNotificationHub, ChangeSource, CustomEventBusSource, EventChannel,
    HubSubscription, PlatformEmitterSource, TableFeedSource,
};
use crate::history::{HistoricalAggregator, HistoryPoint, HistoryServiceTrait, MoMGrowth};
use crate::identity::IdentityProviderTrait;
use crate::refresh::{RefreshCoordinator, RefreshState};
use crate::utils::time_utils::Clock;

/// Live balances for one signed-in user.
///
/// Lifecycle is `new` then `start` then `dispose`. Reads are synchronous and
/// served from the cache; the only awaits are explicit actions.
pub struct BalanceDashboard {
    config: EngineConfig,
    coordinator: RefreshCoordinator,
    history: HistoricalAggregator,
    hub: ChangeNotificationHub,
    subscription: Mutex<Option<HubSubscription>>,
    disposed: AtomicBool,
}

impl BalanceDashboard {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn BalanceStoreTrait>,
        identity: Arc<dyn IdentityProviderTrait>,
        sources: Vec<Arc<dyn ChangeSource>>,
    ) -> Self {
        let coordinator =
            RefreshCoordinator::new(Arc::clone(&store), Arc::clone(&identity), config.clone());
        let history = HistoricalAggregator::new(store, identity, &config);

        Self {
            config,
            coordinator,
            history,
            hub: ChangeNotificationHub::new(sources),
            subscription: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.history.set_clock(clock);
        self
    }

    /// The four standard channels: both table feeds, the in-process bus and
    /// the platform emitter, with setup delays taken from `config`.
    pub fn standard_sources(
        config: &EngineConfig,
        feed: Arc<dyn ChangeFeed>,
        identity: Arc<dyn IdentityProviderTrait>,
        bus: Arc<dyn EventChannel>,
        emitter: Arc<dyn EventChannel>,
    ) -> Vec<Arc<dyn ChangeSource>> {
        let setup = &config.setup;
        vec![
            Arc::new(TableFeedSource::balances(
                Arc::clone(&feed),
                Arc::clone(&identity),
                Duration::from_millis(setup.balances_ms),
            )),
            Arc::new(TableFeedSource::transactions(
                feed,
                identity,
                Duration::from_millis(setup.transactions_ms),
            )),
            Arc::new(CustomEventBusSource::new(
                bus,
                config.event_name.clone(),
                Duration::from_millis(setup.event_bus_ms),
            )),
            Arc::new(PlatformEmitterSource::new(
                emitter,
                config.event_name.clone(),
                Duration::ZERO,
            )),
        ]
    }

    /// Subscribes every change source and performs the initial load.
    /// Calling it again, or after `dispose`, does nothing.
    pub async fn start(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut subscription = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
            if subscription.is_some() {
                debug!("Dashboard already started");
                return;
            }
            let coordinator = self.coordinator.clone();
            *subscription = Some(self.hub.subscribe(move |event| {
                coordinator.invalidate(event.source());
            }));
        }
        info!(
            "Dashboard started with channels {:?}",
            self.hub.source_names()
        );

        self.coordinator.refresh().await;
    }

    /// Unsubscribes all channels, cancels pending refreshes and drops any
    /// in-flight result. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        self.coordinator.dispose();
        info!("Dashboard disposed");
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Sum of all non-liability balances.
    pub fn total_balance(&self) -> Decimal {
        self.coordinator.cache().total_excluding_liabilities()
    }

    pub fn balances(&self) -> Vec<AccountBalance> {
        self.coordinator.cache().all()
    }

    pub fn bank_account_balances(&self) -> Vec<AccountBalance> {
        self.coordinator.cache().bank_accounts()
    }

    pub fn get_account_balance(&self, account_id: &str) -> Option<AccountBalance> {
        self.coordinator.cache().get(account_id)
    }

    pub fn loading(&self) -> bool {
        self.coordinator.state().loading
    }

    /// User-displayable message of the last recorded failure.
    pub fn error(&self) -> Option<String> {
        self.coordinator.state().error_message()
    }

    pub fn state(&self) -> RefreshState {
        self.coordinator.state()
    }

    /// Revision counter bumped on every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.coordinator.subscribe()
    }

    pub async fn refresh_balances(&self) {
        self.coordinator.refresh().await;
    }

    pub async fn get_mom_growth_with_fallback(&self, current_total: Decimal) -> MoMGrowth {
        self.history.get_mom_growth_with_fallback(current_total).await
    }

    /// Monthly series for `account_id`, or all accounts when `None`.
    /// `months` defaults to the configured history length.
    pub async fn fetch_account_history(
        &self,
        account_id: Option<&str>,
        months: Option<u32>,
    ) -> Vec<HistoryPoint> {
        let months = months.unwrap_or(self.config.history_months);
        self.history.fetch_account_history(account_id, months).await
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }
}

impl Drop for BalanceDashboard {
    fn drop(&mut self) {
        self.dispose();
    }
}
