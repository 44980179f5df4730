//! Store trait for balance and snapshot queries.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::AccountBalance;
use crate::errors::Result;
use crate::history::BalanceSnapshot;

/// Query collaborator backing the engine.
///
/// `demo` switches the whole dataset (demo tables vs. real tables); it never
/// merges the two.
#[async_trait]
pub trait BalanceStoreTrait: Send + Sync {
    /// Current balance of every account visible to the signed-in user.
    async fn query_balances(&self, demo: bool) -> Result<Vec<AccountBalance>>;

    /// Snapshot rows with `start <= snapshot_date <= end`, ordered by
    /// `snapshot_date` descending.
    async fn query_snapshots(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        demo: bool,
    ) -> Result<Vec<BalanceSnapshot>>;
}
