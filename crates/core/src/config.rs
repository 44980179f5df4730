//! Engine configuration.
//!
//! All timings are stored in milliseconds so the struct can be loaded from
//! JSON or from `TALLY_*` environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{BALANCE_UPDATED_EVENT, DEFAULT_HISTORY_MONTHS, MAX_HISTORY_MONTHS};
use crate::errors::{Error, Result};
use crate::events::InvalidationSource;

/// Quiet periods applied before an invalidation turns into a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebounceDelays {
    pub balance_table_ms: u64,
    pub custom_event_ms: u64,
    pub emitter_ms: u64,
    /// Transaction writes recompute balances asynchronously on the server, so
    /// they get the longest settle time.
    pub transaction_table_ms: u64,
}

impl Default for DebounceDelays {
    fn default() -> Self {
        Self {
            balance_table_ms: 100,
            custom_event_ms: 300,
            emitter_ms: 300,
            transaction_table_ms: 500,
        }
    }
}

/// Delays between hub start and channel subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetupDelays {
    pub balances_ms: u64,
    pub transactions_ms: u64,
    pub event_bus_ms: u64,
}

impl Default for SetupDelays {
    fn default() -> Self {
        Self {
            balances_ms: 100,
            transactions_ms: 150,
            event_bus_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Surface transient failures instead of suppressing them.
    pub verbose_errors: bool,
    /// Event name used on the in-process bus and the platform emitter.
    pub event_name: String,
    /// Upper bound for a single snapshot query.
    pub history_timeout_ms: u64,
    pub history_months: u32,
    pub debounce: DebounceDelays,
    pub setup: SetupDelays,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verbose_errors: false,
            event_name: BALANCE_UPDATED_EVENT.to_string(),
            history_timeout_ms: 10_000,
            history_months: DEFAULT_HISTORY_MONTHS,
            debounce: DebounceDelays::default(),
            setup: SetupDelays::default(),
        }
    }
}

impl EngineConfig {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration from an arbitrary key lookup. Missing keys keep
    /// their defaults; malformed values are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("TALLY_VERBOSE_ERRORS") {
            config.verbose_errors = parse_bool("TALLY_VERBOSE_ERRORS", &raw)?;
        }
        if let Some(raw) = lookup("TALLY_EVENT_NAME") {
            let name = raw.trim();
            if name.is_empty() {
                return Err(Error::Config("TALLY_EVENT_NAME must not be empty".into()));
            }
            config.event_name = name.to_string();
        }

        let millis = |key: &str, target: &mut u64| -> Result<()> {
            if let Some(raw) = lookup(key) {
                *target = raw.trim().parse().map_err(|_| {
                    Error::Config(format!(
                        "{} must be a number of milliseconds, got '{}'",
                        key, raw
                    ))
                })?;
            }
            Ok(())
        };
        millis("TALLY_HISTORY_TIMEOUT_MS", &mut config.history_timeout_ms)?;
        millis("TALLY_DEBOUNCE_BALANCES_MS", &mut config.debounce.balance_table_ms)?;
        millis("TALLY_DEBOUNCE_CUSTOM_EVENT_MS", &mut config.debounce.custom_event_ms)?;
        millis("TALLY_DEBOUNCE_EMITTER_MS", &mut config.debounce.emitter_ms)?;
        millis("TALLY_DEBOUNCE_TRANSACTIONS_MS", &mut config.debounce.transaction_table_ms)?;
        millis("TALLY_SETUP_BALANCES_MS", &mut config.setup.balances_ms)?;
        millis("TALLY_SETUP_TRANSACTIONS_MS", &mut config.setup.transactions_ms)?;
        millis("TALLY_SETUP_EVENT_BUS_MS", &mut config.setup.event_bus_ms)?;

        if let Some(raw) = lookup("TALLY_HISTORY_MONTHS") {
            config.history_months = raw
                .trim()
                .parse()
                .ok()
                .filter(|months| (1..=MAX_HISTORY_MONTHS).contains(months))
                .ok_or_else(|| {
                    Error::Config(format!(
                        "TALLY_HISTORY_MONTHS must be between 1 and {}, got '{}'",
                        MAX_HISTORY_MONTHS, raw
                    ))
                })?;
        }

        Ok(config)
    }

    pub fn history_timeout(&self) -> Duration {
        Duration::from_millis(self.history_timeout_ms)
    }

    /// Quiet period for an invalidation coming from `source`.
    pub fn debounce_for(&self, source: InvalidationSource) -> Duration {
        let ms = match source {
            InvalidationSource::BalanceTable => self.debounce.balance_table_ms,
            InvalidationSource::TransactionTable => self.debounce.transaction_table_ms,
            InvalidationSource::CustomEvent => self.debounce.custom_event_ms,
            InvalidationSource::Emitter => self.debounce.emitter_ms,
            InvalidationSource::Manual => 0,
        };
        Duration::from_millis(ms)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::Config(format!("{} must be a boolean, got '{}'", key, raw))),
    }
}
