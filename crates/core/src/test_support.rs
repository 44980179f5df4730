//! Mock collaborators shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::sync::Semaphore;

use crate::balances::{AccountBalance, AccountType, BalanceStoreTrait};
use crate::errors::{Error, Result};
use crate::history::BalanceSnapshot;
use crate::identity::{IdentityProviderTrait, UserIdentity};

pub fn balance(id: &str, account_type: AccountType, amount: Decimal) -> AccountBalance {
    AccountBalance::new(
        id,
        account_type,
        amount,
        Utc.with_ymd_and_hms(2024, 5, 20, 9, 30, 0).unwrap(),
    )
}

pub fn snapshot(id: &str, amount: Decimal, date: (i32, u32, u32)) -> BalanceSnapshot {
    BalanceSnapshot::new(
        id,
        amount,
        NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
    )
}

#[derive(Default)]
pub struct MockBalanceStore {
    balances: Mutex<Vec<AccountBalance>>,
    demo_balances: Mutex<Vec<AccountBalance>>,
    balance_failures: Mutex<VecDeque<Error>>,
    snapshots: Mutex<Vec<BalanceSnapshot>>,
    snapshot_failure: Mutex<Option<Error>>,
    snapshot_hang: AtomicBool,
    snapshot_delay: Mutex<Option<Duration>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    balance_calls: AtomicUsize,
    demo_flags: Mutex<Vec<bool>>,
    snapshot_windows: Mutex<Vec<(NaiveDate, NaiveDate)>>,
}

impl MockBalanceStore {
    pub fn with_balances(balances: Vec<AccountBalance>) -> Self {
        let store = Self::default();
        store.set_balances(balances);
        store
    }

    pub fn set_balances(&self, balances: Vec<AccountBalance>) {
        *self.balances.lock().unwrap() = balances;
    }

    pub fn set_demo_balances(&self, balances: Vec<AccountBalance>) {
        *self.demo_balances.lock().unwrap() = balances;
    }

    /// The next `query_balances` call fails with `error`.
    pub fn fail_next(&self, error: Error) {
        self.balance_failures.lock().unwrap().push_back(error);
    }

    /// Every `query_balances` call waits for a permit from the returned
    /// semaphore.
    pub fn gate(&self) -> Arc<Semaphore> {
        let semaphore = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(semaphore.clone());
        semaphore
    }

    pub fn add_snapshots(&self, rows: Vec<BalanceSnapshot>) {
        self.snapshots.lock().unwrap().extend(rows);
    }

    pub fn fail_snapshots(&self, error: Error) {
        *self.snapshot_failure.lock().unwrap() = Some(error);
    }

    pub fn hang_snapshots(&self) {
        self.snapshot_hang.store(true, Ordering::SeqCst);
    }

    pub fn delay_snapshots(&self, delay: Duration) {
        *self.snapshot_delay.lock().unwrap() = Some(delay);
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn demo_flags(&self) -> Vec<bool> {
        self.demo_flags.lock().unwrap().clone()
    }

    pub fn snapshot_windows(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.snapshot_windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl BalanceStoreTrait for MockBalanceStore {
    async fn query_balances(&self, demo: bool) -> Result<Vec<AccountBalance>> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.demo_flags.lock().unwrap().push(demo);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        if let Some(err) = self.balance_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        if demo {
            Ok(self.demo_balances.lock().unwrap().clone())
        } else {
            Ok(self.balances.lock().unwrap().clone())
        }
    }

    async fn query_snapshots(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        _demo: bool,
    ) -> Result<Vec<BalanceSnapshot>> {
        self.snapshot_windows.lock().unwrap().push((start, end));

        if self.snapshot_hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let delay = *self.snapshot_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.snapshot_failure.lock().unwrap().clone() {
            return Err(err);
        }

        let mut rows: Vec<BalanceSnapshot> = self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.snapshot_date >= start && s.snapshot_date <= end)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.snapshot_date.cmp(&a.snapshot_date));
        Ok(rows)
    }
}

pub struct MockIdentity {
    user: Mutex<Option<UserIdentity>>,
    demo: AtomicBool,
}

impl MockIdentity {
    pub fn signed_in() -> Self {
        Self {
            user: Mutex::new(Some(UserIdentity::new("user-1"))),
            demo: AtomicBool::new(false),
        }
    }

    pub fn signed_out() -> Self {
        let identity = Self::signed_in();
        *identity.user.lock().unwrap() = None;
        identity
    }

    pub fn set_demo(&self, demo: bool) {
        self.demo.store(demo, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProviderTrait for MockIdentity {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        Ok(self.user.lock().unwrap().clone())
    }

    fn is_demo_mode(&self) -> bool {
        self.demo.load(Ordering::SeqCst)
    }
}

/// Yields to the scheduler until `condition` holds or the attempts run out.
pub async fn wait_until<F>(condition: F)
where
    F: Fn() -> bool,
{
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
