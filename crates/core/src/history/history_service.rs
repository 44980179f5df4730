use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use futures::future::join_all;
use log::{debug, warn};
use rust_decimal::Decimal;

use super::history_model::{BalanceSnapshot, HistoryPoint, MoMGrowth};
use super::history_traits::HistoryServiceTrait;
use crate::balances::BalanceStoreTrait;
use crate::classifier::ErrorClassifier;
use crate::config::EngineConfig;
use crate::constants::MAX_HISTORY_MONTHS;
use crate::errors::{DataError, Error, Result};
use crate::identity::IdentityProviderTrait;
use crate::utils::time_utils::{
    month_bounds, previous_month, trailing_months, Clock, SystemClock,
};

/// Reads balance snapshots and turns them into month-end figures and time
/// series.
///
/// Every snapshot query is bounded by the configured history timeout. The
/// aggregator holds no state between calls.
pub struct HistoricalAggregator {
    store: Arc<dyn BalanceStoreTrait>,
    identity: Arc<dyn IdentityProviderTrait>,
    classifier: ErrorClassifier,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl HistoricalAggregator {
    pub fn new(
        store: Arc<dyn BalanceStoreTrait>,
        identity: Arc<dyn IdentityProviderTrait>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            identity,
            classifier: ErrorClassifier::new(config.verbose_errors),
            clock: Arc::new(SystemClock),
            timeout: config.history_timeout(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.set_clock(clock);
        self
    }

    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    /// Runs one snapshot query under the timeout. Transient failures become an
    /// empty result.
    async fn query_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<BalanceSnapshot>> {
        let demo = self.identity.is_demo_mode();
        let outcome = tokio::time::timeout(
            self.timeout,
            self.store.query_snapshots(start, end, demo),
        )
        .await;

        let err = match outcome {
            Ok(Ok(rows)) => return Ok(rows),
            Ok(Err(err)) => err,
            Err(_) => Error::Data(DataError::Timeout(self.timeout)),
        };

        let classified = self.classifier.classify(&err);
        if !classified.kind.is_transient() {
            return Err(err);
        }
        if classified.suppress {
            debug!(
                "Snapshot query {}..{} failed ({:?}), treating as empty: {}",
                start, end, classified.kind, err
            );
        } else {
            warn!(
                "Snapshot query {}..{} failed ({:?}), treating as empty: {}",
                start, end, classified.kind, err
            );
        }
        Ok(Vec::new())
    }

    /// Snapshot points for one monthly bucket. An empty bucket yields a single
    /// zero point dated at the month end, or today for the current month.
    async fn history_bucket(
        &self,
        year: i32,
        month: u32,
        account_id: Option<&str>,
        today: NaiveDate,
    ) -> Vec<HistoryPoint> {
        let (start, end) = match month_bounds(year, month) {
            Ok(bounds) => bounds,
            Err(err) => {
                warn!("Skipping history bucket {}-{:02}: {}", year, month, err);
                return Vec::new();
            }
        };

        let rows = match self.query_window(start, end).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!("History bucket {}-{:02} failed: {}", year, month, err);
                Vec::new()
            }
        };

        let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for row in rows
            .iter()
            .filter(|row| account_id.map_or(true, |id| row.account_id == id))
        {
            *by_date.entry(row.snapshot_date).or_insert(Decimal::ZERO) += row.balance;
        }

        if by_date.is_empty() {
            return vec![HistoryPoint {
                date: end.min(today),
                value: Decimal::ZERO,
            }];
        }

        by_date
            .into_iter()
            .map(|(date, value)| HistoryPoint { date, value })
            .collect()
    }
}

/// Keeps the latest row per account. Rows arrive newest first; on equal dates
/// the row that came first wins.
fn latest_per_account(rows: Vec<BalanceSnapshot>) -> Vec<BalanceSnapshot> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut latest: Vec<BalanceSnapshot> = Vec::new();

    for row in rows {
        match index.get(&row.account_id) {
            Some(&i) => {
                if row.snapshot_date > latest[i].snapshot_date {
                    latest[i] = row;
                }
            }
            None => {
                index.insert(row.account_id.clone(), latest.len());
                latest.push(row);
            }
        }
    }

    latest
}

#[async_trait]
impl HistoryServiceTrait for HistoricalAggregator {
    async fn fetch_month_end_balances(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<BalanceSnapshot>> {
        let (start, end) = month_bounds(year, month)?;
        let rows = self.query_window(start, end).await?;
        let latest = latest_per_account(rows);
        debug!(
            "Month-end balances for {}-{:02}: {} account(s)",
            year,
            month,
            latest.len()
        );
        Ok(latest)
    }

    async fn calculate_mom_growth(&self, current_total: Decimal) -> Option<MoMGrowth> {
        let today = self.clock.today();
        let (year, month) = previous_month(today.year(), today.month());

        match self.fetch_month_end_balances(year, month).await {
            Ok(rows) if rows.is_empty() => {
                debug!("No snapshots for {}-{:02}, growth is neutral", year, month);
                Some(MoMGrowth::neutral(current_total, Decimal::ZERO, false))
            }
            Ok(rows) => {
                let previous_total: Decimal = rows.iter().map(|r| r.balance).sum();
                Some(MoMGrowth::compare(current_total, previous_total))
            }
            Err(err) => {
                warn!("Month-over-month growth unavailable: {}", err);
                None
            }
        }
    }

    async fn get_mom_growth_with_fallback(&self, current_total: Decimal) -> MoMGrowth {
        match self.calculate_mom_growth(current_total).await {
            Some(growth) => growth,
            None => MoMGrowth::neutral(current_total, current_total, false),
        }
    }

    async fn fetch_account_history(
        &self,
        account_id: Option<&str>,
        months: u32,
    ) -> Vec<HistoryPoint> {
        let today = self.clock.today();
        let months = months.clamp(1, MAX_HISTORY_MONTHS);
        let buckets = trailing_months(today, months);

        let results = join_all(
            buckets
                .iter()
                .map(|&(year, month)| self.history_bucket(year, month, account_id, today)),
        )
        .await;

        let mut points: Vec<HistoryPoint> = results.into_iter().flatten().collect();
        points.sort_by_key(|p| p.date);
        points
    }
}
