//! Single-writer cache of the last successful balance fetch.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;

use super::AccountBalance;

/// Holds the balances of the last successful fetch.
///
/// Readers get a shared snapshot; `replace_all` swaps the whole set at once so
/// nobody ever observes a half-written state. The cache has no notion of
/// staleness.
#[derive(Debug)]
pub struct BalanceCache {
    snapshot: RwLock<Arc<[AccountBalance]>>,
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceCache {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Replaces the cached set. Rows repeating an `account_id` overwrite the
    /// earlier row but keep its position.
    pub fn replace_all(&self, balances: Vec<AccountBalance>) {
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(balances.len());
        let mut unique: Vec<AccountBalance> = Vec::with_capacity(balances.len());

        for balance in balances {
            match positions.get(&balance.account_id) {
                Some(&idx) => unique[idx] = balance,
                None => {
                    positions.insert(balance.account_id.clone(), unique.len());
                    unique.push(balance);
                }
            }
        }

        let next: Arc<[AccountBalance]> = unique.into();
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = next;
    }

    /// Shared view of the current set.
    pub fn snapshot(&self) -> Arc<[AccountBalance]> {
        self.snapshot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn get(&self, account_id: &str) -> Option<AccountBalance> {
        self.snapshot()
            .iter()
            .find(|b| b.account_id == account_id)
            .cloned()
    }

    pub fn all(&self) -> Vec<AccountBalance> {
        self.snapshot().to_vec()
    }

    /// Non-liability accounts, in insertion order.
    pub fn bank_accounts(&self) -> Vec<AccountBalance> {
        self.snapshot()
            .iter()
            .filter(|b| !b.is_liability())
            .cloned()
            .collect()
    }

    /// Sum of balances over non-liability accounts. Recomputed on every call.
    pub fn total_excluding_liabilities(&self) -> Decimal {
        self.snapshot()
            .iter()
            .filter(|b| !b.is_liability())
            .map(|b| b.current_balance)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
