//! Historical balance models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{DISPLAY_DECIMAL_PRECISION, TREND_DEAD_ZONE_PERCENT};

/// Balance of one account as recorded on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    pub account_id: String,
    pub balance: Decimal,
    pub snapshot_date: NaiveDate,
}

impl BalanceSnapshot {
    pub fn new(account_id: impl Into<String>, balance: Decimal, snapshot_date: NaiveDate) -> Self {
        Self {
            account_id: account_id.into(),
            balance,
            snapshot_date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl Trend {
    /// Percentages inside the dead zone are neutral so rounding noise does
    /// not flip the trend.
    pub fn from_change_percentage(percentage: Decimal) -> Self {
        if percentage > TREND_DEAD_ZONE_PERCENT {
            Trend::Up
        } else if percentage < -TREND_DEAD_ZONE_PERCENT {
            Trend::Down
        } else {
            Trend::Neutral
        }
    }
}

/// Month-over-month comparison of the live total against last month's close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoMGrowth {
    pub current_month_total: Decimal,
    pub previous_month_total: Decimal,
    pub change_amount: Decimal,
    pub change_percentage: Decimal,
    pub trend: Trend,
    pub formatted_change: String,
    /// False when the previous month had no snapshot rows. The figures are
    /// then a neutral placeholder, not a measured "no change".
    pub has_history: bool,
}

impl MoMGrowth {
    /// Compares `current` against `previous`.
    pub fn compare(current: Decimal, previous: Decimal) -> Self {
        let change_amount = current - previous;
        let change_percentage = if previous.is_zero() {
            Decimal::ZERO
        } else {
            (change_amount / previous.abs() * Decimal::ONE_HUNDRED)
                .round_dp(DISPLAY_DECIMAL_PRECISION)
        };

        Self {
            current_month_total: current,
            previous_month_total: previous,
            change_amount,
            change_percentage,
            trend: Trend::from_change_percentage(change_percentage),
            formatted_change: format_change(change_amount, change_percentage),
            has_history: true,
        }
    }

    /// Neutral growth with explicit totals and no measured change.
    pub fn neutral(current: Decimal, previous: Decimal, has_history: bool) -> Self {
        Self {
            current_month_total: current,
            previous_month_total: previous,
            change_amount: Decimal::ZERO,
            change_percentage: Decimal::ZERO,
            trend: Trend::Neutral,
            formatted_change: format_change(Decimal::ZERO, Decimal::ZERO),
            has_history,
        }
    }
}

fn signed(value: Decimal) -> String {
    let rounded = value.round_dp(DISPLAY_DECIMAL_PRECISION);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else if rounded.is_zero() {
        ""
    } else {
        "+"
    };
    format!("{}{:.2}", sign, rounded.abs())
}

/// Renders a change as `+250.00 (+5.26%)`.
pub fn format_change(amount: Decimal, percentage: Decimal) -> String {
    format!("{} ({}%)", signed(amount), signed(percentage))
}

/// One point of a balance time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

/// True when at least one point carries a non-zero value.
///
/// Empty months are reported as zero points rather than gaps, so a series of
/// zeros means "no data yet" to a chart.
pub fn history_has_data(points: &[HistoryPoint]) -> bool {
    points.iter().any(|p| !p.value.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_trend_dead_zone() {
        assert_eq!(Trend::from_change_percentage(dec!(0.05)), Trend::Neutral);
        assert_eq!(Trend::from_change_percentage(dec!(0.1)), Trend::Neutral);
        assert_eq!(Trend::from_change_percentage(dec!(0.11)), Trend::Up);
        assert_eq!(Trend::from_change_percentage(dec!(-0.1)), Trend::Neutral);
        assert_eq!(Trend::from_change_percentage(dec!(-0.11)), Trend::Down);
    }

    #[test]
    fn test_compare_computes_percentage_against_previous() {
        let growth = MoMGrowth::compare(dec!(5000), dec!(4750));
        assert_eq!(growth.change_amount, dec!(250));
        assert_eq!(growth.change_percentage, dec!(5.26));
        assert_eq!(growth.trend, Trend::Up);
        assert_eq!(growth.formatted_change, "+250.00 (+5.26%)");
        assert!(growth.has_history);
    }

    #[test]
    fn test_compare_with_negative_previous_uses_magnitude() {
        let growth = MoMGrowth::compare(dec!(-50), dec!(-100));
        assert_eq!(growth.change_amount, dec!(50));
        assert_eq!(growth.change_percentage, dec!(50));
        assert_eq!(growth.trend, Trend::Up);
    }

    #[test]
    fn test_compare_decline() {
        let growth = MoMGrowth::compare(dec!(900), dec!(1000));
        assert_eq!(growth.change_percentage, dec!(-10));
        assert_eq!(growth.trend, Trend::Down);
        assert_eq!(growth.formatted_change, "-100.00 (-10.00%)");
    }

    #[test]
    fn test_tiny_change_is_neutral() {
        let growth = MoMGrowth::compare(dec!(100000.50), dec!(100000));
        assert_eq!(growth.change_percentage, dec!(0.00));
        assert_eq!(growth.trend, Trend::Neutral);
    }

    #[test]
    fn test_neutral_placeholder() {
        let growth = MoMGrowth::neutral(dec!(5000), dec!(0), false);
        assert_eq!(growth.change_percentage, Decimal::ZERO);
        assert_eq!(growth.trend, Trend::Neutral);
        assert_eq!(growth.formatted_change, "0.00 (0.00%)");
        assert!(!growth.has_history);
    }

    #[test]
    fn test_history_has_data() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let zero = HistoryPoint { date, value: dec!(0) };
        let some = HistoryPoint { date, value: dec!(12.5) };
        assert!(!history_has_data(&[]));
        assert!(!history_has_data(&[zero.clone(), zero.clone()]));
        assert!(history_has_data(&[zero, some]));
    }
}
