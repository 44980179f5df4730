//! Tally Core - Reactive balance aggregation and synchronization.
//!
//! This crate keeps a client-side view of per-account balances consistent with
//! a remote store that is written by several independent sources. It is
//! storage-agnostic and defines traits that are implemented by the
//! `storage-memory` crate or by an embedder's own backend.

pub mod balances;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod errors;
pub mod events;
pub mod history;
pub mod identity;
pub mod refresh;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-export the types most embedders need
pub use balances::{AccountBalance, AccountType, BalanceCache, BalanceStoreTrait};
pub use config::EngineConfig;
pub use dashboard::BalanceDashboard;
pub use history::{BalanceSnapshot, HistoryPoint, MoMGrowth, Trend};
pub use identity::{IdentityProviderTrait, UserIdentity};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
