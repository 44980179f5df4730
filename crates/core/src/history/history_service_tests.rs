//! Unit tests for the historical aggregator.

use super::*;
use crate::config::EngineConfig;
use crate::constants::MAX_HISTORY_MONTHS;
use crate::errors::{DataError, Error};
use crate::test_support::{snapshot, MockBalanceStore, MockIdentity};
use crate::utils::time_utils::FixedClock;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn aggregator(store: Arc<MockBalanceStore>, today: NaiveDate) -> HistoricalAggregator {
    HistoricalAggregator::new(
        store,
        Arc::new(MockIdentity::signed_in()),
        &EngineConfig::default(),
    )
    .with_clock(Arc::new(FixedClock(today)))
}

#[tokio::test]
async fn test_month_end_keeps_latest_row_per_account() {
    let store = Arc::new(MockBalanceStore::default());
    store.add_snapshots(vec![
        snapshot("a", dec!(80), (2024, 5, 15)),
        snapshot("a", dec!(100), (2024, 5, 28)),
        snapshot("b", dec!(20), (2024, 5, 20)),
        snapshot("a", dec!(999), (2024, 6, 1)),
    ]);
    let service = aggregator(store.clone(), date(2024, 6, 15));

    let rows = service.fetch_month_end_balances(2024, 5).await.unwrap();

    assert_eq!(rows.len(), 2);
    let total: Decimal = rows.iter().map(|r| r.balance).sum();
    assert_eq!(total, dec!(120));
    assert_eq!(store.snapshot_windows(), vec![(date(2024, 5, 1), date(2024, 5, 31))]);
}

#[tokio::test]
async fn test_month_end_tie_keeps_first_row() {
    let store = Arc::new(MockBalanceStore::default());
    store.add_snapshots(vec![
        snapshot("a", dec!(50), (2024, 5, 31)),
        snapshot("a", dec!(70), (2024, 5, 31)),
    ]);
    let service = aggregator(store, date(2024, 6, 15));

    let rows = service.fetch_month_end_balances(2024, 5).await.unwrap();

    assert_eq!(rows, vec![snapshot("a", dec!(50), (2024, 5, 31))]);
}

#[tokio::test]
async fn test_month_end_rejects_invalid_month() {
    let service = aggregator(Arc::new(MockBalanceStore::default()), date(2024, 6, 15));
    let err = service.fetch_month_end_balances(2024, 13).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_month_end_propagates_query_failure() {
    let store = Arc::new(MockBalanceStore::default());
    store.fail_snapshots(DataError::query("42P01", "relation does not exist").into());
    let service = aggregator(store, date(2024, 6, 15));

    let err = service.fetch_month_end_balances(2024, 5).await.unwrap_err();
    assert_eq!(err, Error::Data(DataError::query("42P01", "relation does not exist")));
}

#[tokio::test]
async fn test_month_end_network_failure_is_empty() {
    let store = Arc::new(MockBalanceStore::default());
    store.fail_snapshots(DataError::Network("connection refused".into()).into());
    let service = aggregator(store, date(2024, 6, 15));

    let rows = service.fetch_month_end_balances(2024, 5).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_month_end_timeout_is_empty() {
    let store = Arc::new(MockBalanceStore::default());
    store.add_snapshots(vec![snapshot("a", dec!(100), (2024, 5, 28))]);
    store.hang_snapshots();
    let service = aggregator(store, date(2024, 6, 15));

    let started = tokio::time::Instant::now();
    let rows = service.fetch_month_end_balances(2024, 5).await.unwrap();

    assert!(rows.is_empty());
    assert!(started.elapsed() >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_slow_query_within_timeout_succeeds() {
    let store = Arc::new(MockBalanceStore::default());
    store.add_snapshots(vec![snapshot("a", dec!(100), (2024, 5, 28))]);
    store.delay_snapshots(Duration::from_secs(9));
    let service = aggregator(store, date(2024, 6, 15));

    let rows = service.fetch_month_end_balances(2024, 5).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_mom_growth_against_previous_month() {
    let store = Arc::new(MockBalanceStore::default());
    store.add_snapshots(vec![
        snapshot("a", dec!(4000), (2024, 5, 31)),
        snapshot("b", dec!(750), (2024, 5, 30)),
    ]);
    let service = aggregator(store, date(2024, 6, 15));

    let growth = service.calculate_mom_growth(dec!(5000)).await.unwrap();

    assert_eq!(growth.previous_month_total, dec!(4750));
    assert_eq!(growth.change_amount, dec!(250));
    assert_eq!(growth.change_percentage, dec!(5.26));
    assert_eq!(growth.trend, Trend::Up);
    assert_eq!(growth.formatted_change, "+250.00 (+5.26%)");
}

#[tokio::test]
async fn test_mom_growth_dead_zone() {
    let store = Arc::new(MockBalanceStore::default());
    store.add_snapshots(vec![snapshot("a", dec!(10000), (2024, 5, 31))]);
    let service = aggregator(store, date(2024, 6, 15));

    let flat = service.calculate_mom_growth(dec!(10005)).await.unwrap();
    assert_eq!(flat.change_percentage, dec!(0.05));
    assert_eq!(flat.trend, Trend::Neutral);

    let up = service.calculate_mom_growth(dec!(10011)).await.unwrap();
    assert_eq!(up.change_percentage, dec!(0.11));
    assert_eq!(up.trend, Trend::Up);

    let down = service.calculate_mom_growth(dec!(9989)).await.unwrap();
    assert_eq!(down.change_percentage, dec!(-0.11));
    assert_eq!(down.trend, Trend::Down);
}

#[tokio::test]
async fn test_mom_growth_without_history() {
    let service = aggregator(Arc::new(MockBalanceStore::default()), date(2024, 6, 15));

    let growth = service.calculate_mom_growth(dec!(5000)).await.unwrap();

    assert_eq!(growth.current_month_total, dec!(5000));
    assert_eq!(growth.previous_month_total, dec!(0));
    assert_eq!(growth.change_percentage, dec!(0));
    assert_eq!(growth.trend, Trend::Neutral);
    assert!(!growth.has_history);
}

#[tokio::test]
async fn test_mom_growth_in_january_reads_december() {
    let store = Arc::new(MockBalanceStore::default());
    store.add_snapshots(vec![snapshot("a", dec!(1000), (2023, 12, 31))]);
    let service = aggregator(store.clone(), date(2024, 1, 10));

    let growth = service.calculate_mom_growth(dec!(1100)).await.unwrap();

    assert_eq!(store.snapshot_windows(), vec![(date(2023, 12, 1), date(2023, 12, 31))]);
    assert_eq!(growth.previous_month_total, dec!(1000));
    assert_eq!(growth.change_percentage, dec!(10));
}

#[tokio::test]
async fn test_mom_growth_none_on_query_failure_and_fallback_is_neutral() {
    let store = Arc::new(MockBalanceStore::default());
    store.fail_snapshots(DataError::query("500", "internal error").into());
    let service = aggregator(store, date(2024, 6, 15));

    assert!(service.calculate_mom_growth(dec!(5000)).await.is_none());

    let fallback = service.get_mom_growth_with_fallback(dec!(5000)).await;
    assert_eq!(fallback.current_month_total, dec!(5000));
    assert_eq!(fallback.previous_month_total, dec!(5000));
    assert_eq!(fallback.change_amount, dec!(0));
    assert_eq!(fallback.trend, Trend::Neutral);
    assert!(!fallback.has_history);
}

#[tokio::test]
async fn test_fallback_passes_through_real_growth() {
    let store = Arc::new(MockBalanceStore::default());
    store.add_snapshots(vec![snapshot("a", dec!(1000), (2024, 5, 31))]);
    let service = aggregator(store, date(2024, 6, 15));

    let growth = service.get_mom_growth_with_fallback(dec!(900)).await;
    assert_eq!(growth.trend, Trend::Down);
    assert!(growth.has_history);
}

#[tokio::test]
async fn test_history_sums_accounts_per_date_and_fills_empty_months() {
    let store = Arc::new(MockBalanceStore::default());
    store.add_snapshots(vec![
        snapshot("a", dec!(100), (2024, 4, 30)),
        snapshot("b", dec!(50), (2024, 4, 30)),
        snapshot("a", dec!(120), (2024, 6, 10)),
    ]);
    let service = aggregator(store, date(2024, 6, 15));

    let points = service.fetch_account_history(None, 3).await;

    assert_eq!(
        points,
        vec![
            HistoryPoint { date: date(2024, 4, 30), value: dec!(150) },
            HistoryPoint { date: date(2024, 5, 31), value: dec!(0) },
            HistoryPoint { date: date(2024, 6, 10), value: dec!(120) },
        ]
    );
    assert!(history_has_data(&points));
}

#[tokio::test]
async fn test_history_filters_single_account() {
    let store = Arc::new(MockBalanceStore::default());
    store.add_snapshots(vec![
        snapshot("a", dec!(100), (2024, 4, 30)),
        snapshot("b", dec!(50), (2024, 4, 30)),
        snapshot("a", dec!(120), (2024, 6, 10)),
    ]);
    let service = aggregator(store, date(2024, 6, 15));

    let points = service.fetch_account_history(Some("b"), 3).await;

    assert_eq!(
        points,
        vec![
            HistoryPoint { date: date(2024, 4, 30), value: dec!(50) },
            HistoryPoint { date: date(2024, 5, 31), value: dec!(0) },
            HistoryPoint { date: date(2024, 6, 15), value: dec!(0) },
        ]
    );
}

#[tokio::test]
async fn test_history_without_snapshots_is_all_zero() {
    let store = Arc::new(MockBalanceStore::default());
    let service = aggregator(store.clone(), date(2024, 6, 15));

    let points = service.fetch_account_history(None, 12).await;

    assert_eq!(points.len(), 12);
    assert_eq!(store.snapshot_windows().len(), 12);
    assert!(points.iter().all(|p| p.value.is_zero()));
    assert!(!history_has_data(&points));
    assert_eq!(points.first().map(|p| p.date), Some(date(2023, 7, 31)));
    assert_eq!(points.last().map(|p| p.date), Some(date(2024, 6, 15)));
}

#[tokio::test]
async fn test_history_zero_months_means_one() {
    let service = aggregator(Arc::new(MockBalanceStore::default()), date(2024, 6, 15));
    let points = service.fetch_account_history(None, 0).await;
    assert_eq!(points.len(), 1);
}

#[tokio::test]
async fn test_history_months_capped() {
    let store = Arc::new(MockBalanceStore::default());
    let service = aggregator(store.clone(), date(2024, 6, 15));

    let points = service.fetch_account_history(None, u32::MAX).await;

    assert_eq!(points.len(), MAX_HISTORY_MONTHS as usize);
    assert_eq!(store.snapshot_windows().len(), MAX_HISTORY_MONTHS as usize);
    assert_eq!(points.first().map(|p| p.date), Some(date(2014, 7, 31)));
}

#[tokio::test]
async fn test_history_failed_bucket_degrades_to_zero() {
    let store = Arc::new(MockBalanceStore::default());
    store.fail_snapshots(Error::Unexpected("syntax error at or near".into()));
    let service = aggregator(store, date(2024, 6, 15));

    let points = service.fetch_account_history(None, 2).await;

    assert_eq!(points.len(), 2);
    assert!(points.iter().all(|p| p.value.is_zero()));
}

#[tokio::test(start_paused = true)]
async fn test_history_timeout_degrades_to_zero() {
    let store = Arc::new(MockBalanceStore::default());
    store.hang_snapshots();
    let service = aggregator(store, date(2024, 6, 15));

    let points = service.fetch_account_history(None, 2).await;
    assert_eq!(points.len(), 2);
}
