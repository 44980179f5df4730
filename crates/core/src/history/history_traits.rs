//! History service traits.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::history_model::{BalanceSnapshot, HistoryPoint, MoMGrowth};
use crate::errors::Result;

/// Contract for historical balance reads.
///
/// Every method except `fetch_month_end_balances` degrades to a less
/// informative value instead of failing.
#[async_trait]
pub trait HistoryServiceTrait: Send + Sync {
    /// Latest snapshot per account within the given calendar month.
    ///
    /// A timed-out or unreachable store yields an empty result; only genuine
    /// query failures are returned as errors.
    async fn fetch_month_end_balances(&self, year: i32, month: u32)
        -> Result<Vec<BalanceSnapshot>>;

    /// Compares `current_total` (the live total, never a snapshot) against
    /// the previous calendar month's close.
    ///
    /// Returns `None` only when the previous month could not be read.
    async fn calculate_mom_growth(&self, current_total: Decimal) -> Option<MoMGrowth>;

    /// Like [`HistoryServiceTrait::calculate_mom_growth`] but always returns a
    /// displayable value.
    async fn get_mom_growth_with_fallback(&self, current_total: Decimal) -> MoMGrowth;

    /// Monthly time series over the trailing `months` months, oldest first.
    ///
    /// `account_id = None` sums all accounts per date. `months` is clamped to
    /// `1..=MAX_HISTORY_MONTHS`.
    async fn fetch_account_history(
        &self,
        account_id: Option<&str>,
        months: u32,
    ) -> Vec<HistoryPoint>;
}
