//! Historical balances - month-end snapshots, month-over-month growth and
//! multi-month time series.
//!
//! This works on snapshot rows, which the backend writes in batches, so it is
//! deliberately independent of the live balance cache.

mod history_model;
mod history_service;
mod history_traits;

pub use history_model::*;
pub use history_service::HistoricalAggregator;
pub use history_traits::HistoryServiceTrait;

#[cfg(test)]
mod history_service_tests;
