//! Balances module - account balance models, the in-memory cache and the store trait.

mod balances_cache;
mod balances_model;
mod balances_traits;

pub use balances_cache::BalanceCache;
pub use balances_model::{AccountBalance, AccountType};
pub use balances_traits::BalanceStoreTrait;
