//! Dashboard module - the consumer-facing facade over the refresh, change and
//! history machinery.

mod balance_dashboard;

pub use balance_dashboard::BalanceDashboard;
