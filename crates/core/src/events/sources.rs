//! Change sources the hub can subscribe to.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::info;

use super::channels::{ChangeFeed, EventChannel, Subscription};
use super::{ChangeEvent, ChangeTable};
use crate::errors::Result;
use crate::identity::IdentityProviderTrait;

/// Callback the hub hands to every source.
pub type InvalidationCallback = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// One channel that can tell the engine that balances may have changed.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Short name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// How long the hub waits before calling [`ChangeSource::connect`].
    fn setup_delay(&self) -> Duration;

    /// Registers `on_change` with the underlying channel.
    ///
    /// `Ok(None)` means the channel cannot be used right now (for example no
    /// signed-in user) and was skipped.
    async fn connect(&self, on_change: InvalidationCallback) -> Result<Option<Subscription>>;
}

/// Identity-scoped table change feed.
pub struct TableFeedSource {
    name: String,
    table: ChangeTable,
    feed: Arc<dyn ChangeFeed>,
    identity: Arc<dyn IdentityProviderTrait>,
    setup_delay: Duration,
}

impl TableFeedSource {
    pub fn new(
        table: ChangeTable,
        feed: Arc<dyn ChangeFeed>,
        identity: Arc<dyn IdentityProviderTrait>,
        setup_delay: Duration,
    ) -> Self {
        Self {
            name: format!("{}-feed", table.table_name()),
            table,
            feed,
            identity,
            setup_delay,
        }
    }

    pub fn balances(
        feed: Arc<dyn ChangeFeed>,
        identity: Arc<dyn IdentityProviderTrait>,
        setup_delay: Duration,
    ) -> Self {
        Self::new(ChangeTable::Balances, feed, identity, setup_delay)
    }

    /// Transaction writes trigger a server-side balance recompute, so they
    /// invalidate balances as well.
    pub fn transactions(
        feed: Arc<dyn ChangeFeed>,
        identity: Arc<dyn IdentityProviderTrait>,
        setup_delay: Duration,
    ) -> Self {
        Self::new(ChangeTable::Transactions, feed, identity, setup_delay)
    }
}

#[async_trait]
impl ChangeSource for TableFeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup_delay(&self) -> Duration {
        self.setup_delay
    }

    async fn connect(&self, on_change: InvalidationCallback) -> Result<Option<Subscription>> {
        let user = match self.identity.current_user().await? {
            Some(user) => user,
            None => {
                info!("No signed-in user, skipping {} subscription", self.name);
                return Ok(None);
            }
        };

        let subscription = self.feed.subscribe_table_changes(
            self.table,
            &user.id,
            Arc::new(move |change| on_change(ChangeEvent::TableChange(change))),
        )?;
        Ok(Some(subscription))
    }
}

/// Same-process event bus, the primary fallback when table feeds are
/// unavailable.
pub struct CustomEventBusSource {
    channel: Arc<dyn EventChannel>,
    event_name: String,
    setup_delay: Duration,
}

impl CustomEventBusSource {
    pub fn new(
        channel: Arc<dyn EventChannel>,
        event_name: impl Into<String>,
        setup_delay: Duration,
    ) -> Self {
        Self {
            channel,
            event_name: event_name.into(),
            setup_delay,
        }
    }
}

#[async_trait]
impl ChangeSource for CustomEventBusSource {
    fn name(&self) -> &str {
        "custom-event-bus"
    }

    fn setup_delay(&self) -> Duration {
        self.setup_delay
    }

    async fn connect(&self, on_change: InvalidationCallback) -> Result<Option<Subscription>> {
        let subscription = self.channel.listen(
            &self.event_name,
            Arc::new(move |payload| on_change(ChangeEvent::CustomEvent { payload })),
        )?;
        Ok(Some(subscription))
    }
}

/// Cross-platform emitter. Always subscribed, even when table feeds work,
/// because feed failures are silent.
pub struct PlatformEmitterSource {
    emitter: Arc<dyn EventChannel>,
    event_name: String,
    setup_delay: Duration,
}

impl PlatformEmitterSource {
    pub fn new(
        emitter: Arc<dyn EventChannel>,
        event_name: impl Into<String>,
        setup_delay: Duration,
    ) -> Self {
        Self {
            emitter,
            event_name: event_name.into(),
            setup_delay,
        }
    }
}

#[async_trait]
impl ChangeSource for PlatformEmitterSource {
    fn name(&self) -> &str {
        "platform-emitter"
    }

    fn setup_delay(&self) -> Duration {
        self.setup_delay
    }

    async fn connect(&self, on_change: InvalidationCallback) -> Result<Option<Subscription>> {
        let subscription = self.emitter.listen(
            &self.event_name,
            Arc::new(move |payload| on_change(ChangeEvent::EmitterEvent { payload })),
        )?;
        Ok(Some(subscription))
    }
}
