//! Table store implementing the balance query collaborator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::{debug, warn};
use tally_core::balances::{AccountBalance, BalanceStoreTrait};
use tally_core::errors::{DataError, Error, Result};
use tally_core::events::{ChangeFeed, ChangeKind, ChangeTable, Subscription, TableChangeCallback};
use tally_core::history::BalanceSnapshot;
use tokio::task::JoinHandle;

use crate::feed::FeedRegistry;
use crate::model::{NewTransaction, Transaction};

/// Delay between a transaction write and the balance recompute it triggers.
pub const DEFAULT_RECOMPUTE_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
struct Dataset {
    balances: Vec<AccountBalance>,
    transactions: Vec<Transaction>,
    snapshots: Vec<BalanceSnapshot>,
}

struct StoreInner {
    real: Mutex<Dataset>,
    demo: Mutex<Dataset>,
    feed: FeedRegistry,
    failure: Mutex<Option<DataError>>,
    query_delay: Mutex<Duration>,
    recompute_delay: Duration,
    queries: AtomicUsize,
}

impl StoreInner {
    fn dataset(&self, demo: bool) -> &Mutex<Dataset> {
        if demo {
            &self.demo
        } else {
            &self.real
        }
    }

    /// Applies injected latency and failures, in that order.
    async fn before_query(&self) -> Result<()> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let delay = *self.query_delay.lock().unwrap_or_else(|e| e.into_inner());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.failure.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            Some(failure) => Err(Error::Data(failure)),
            None => Ok(()),
        }
    }

    fn apply_transaction(&self, demo: bool, transaction: &Transaction) -> bool {
        let mut dataset = self.dataset(demo).lock().unwrap_or_else(|e| e.into_inner());
        match dataset
            .balances
            .iter_mut()
            .find(|b| b.account_id == transaction.account_id)
        {
            Some(balance) => {
                balance.current_balance += transaction.amount;
                balance.last_updated = Utc::now();
                true
            }
            None => false,
        }
    }
}

/// In-memory backend with separate real and demo tables.
///
/// Every write is announced on the built-in change feed. Cloning is cheap and
/// all clones share the same tables.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_recompute_delay(DEFAULT_RECOMPUTE_DELAY)
    }

    pub fn with_recompute_delay(recompute_delay: Duration) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                real: Mutex::new(Dataset::default()),
                demo: Mutex::new(Dataset::default()),
                feed: FeedRegistry::new(),
                failure: Mutex::new(None),
                query_delay: Mutex::new(Duration::ZERO),
                recompute_delay,
                queries: AtomicUsize::new(0),
            }),
        }
    }

    pub fn feed(&self) -> &FeedRegistry {
        &self.inner.feed
    }

    /// Inserts or replaces the balance row of `balance.account_id`.
    pub fn upsert_balance(&self, demo: bool, balance: AccountBalance) {
        let account_id = balance.account_id.clone();
        let kind = {
            let mut dataset = self.inner.dataset(demo).lock().unwrap_or_else(|e| e.into_inner());
            match dataset
                .balances
                .iter_mut()
                .find(|b| b.account_id == balance.account_id)
            {
                Some(existing) => {
                    *existing = balance;
                    ChangeKind::Update
                }
                None => {
                    dataset.balances.push(balance);
                    ChangeKind::Insert
                }
            }
        };
        self.inner.feed.emit(ChangeTable::Balances, kind, Some(&account_id));
    }

    /// Removes an account's balance row. Returns false if there was none.
    pub fn delete_balance(&self, demo: bool, account_id: &str) -> bool {
        let removed = {
            let mut dataset = self.inner.dataset(demo).lock().unwrap_or_else(|e| e.into_inner());
            let before = dataset.balances.len();
            dataset.balances.retain(|b| b.account_id != account_id);
            dataset.balances.len() != before
        };
        if removed {
            self.inner
                .feed
                .emit(ChangeTable::Balances, ChangeKind::Delete, Some(account_id));
        }
        removed
    }

    /// Records a transaction and schedules the balance recompute.
    ///
    /// The transaction change is announced immediately, the balance change
    /// only once the recompute has run. Must be called within a Tokio runtime.
    pub fn insert_transaction(
        &self,
        demo: bool,
        new_transaction: NewTransaction,
    ) -> (Transaction, JoinHandle<()>) {
        let transaction = Transaction::from_new(new_transaction);
        self.inner
            .dataset(demo)
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .transactions
            .push(transaction.clone());
        self.inner.feed.emit(
            ChangeTable::Transactions,
            ChangeKind::Insert,
            Some(&transaction.account_id),
        );

        let inner = Arc::clone(&self.inner);
        let pending = transaction.clone();
        let recompute = tokio::spawn(async move {
            tokio::time::sleep(inner.recompute_delay).await;
            if inner.apply_transaction(demo, &pending) {
                debug!("Recomputed balance of {} after {}", pending.account_id, pending.id);
                inner.feed.emit(
                    ChangeTable::Balances,
                    ChangeKind::Update,
                    Some(&pending.account_id),
                );
            } else {
                warn!(
                    "Transaction {} references unknown account {}",
                    pending.id, pending.account_id
                );
            }
        });

        (transaction, recompute)
    }

    pub fn transactions(&self, demo: bool) -> Vec<Transaction> {
        self.inner
            .dataset(demo)
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .transactions
            .clone()
    }

    pub fn insert_snapshot(&self, demo: bool, snapshot: BalanceSnapshot) {
        self.inner
            .dataset(demo)
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshots
            .push(snapshot);
    }

    /// Writes one snapshot per account with its current balance, dated `date`.
    pub fn record_daily_snapshots(&self, demo: bool, date: NaiveDate) -> usize {
        let mut dataset = self.inner.dataset(demo).lock().unwrap_or_else(|e| e.into_inner());
        let rows: Vec<BalanceSnapshot> = dataset
            .balances
            .iter()
            .map(|b| BalanceSnapshot::new(b.account_id.clone(), b.current_balance, date))
            .collect();
        let count = rows.len();
        dataset.snapshots.extend(rows);
        count
    }

    /// Every query fails with `failure` until cleared with `None`.
    pub fn set_failure(&self, failure: Option<DataError>) {
        *self.inner.failure.lock().unwrap_or_else(|e| e.into_inner()) = failure;
    }

    pub fn set_query_delay(&self, delay: Duration) {
        *self.inner.query_delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    /// Queries received so far, failed ones included.
    pub fn query_count(&self) -> usize {
        self.inner.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceStoreTrait for MemoryStore {
    async fn query_balances(&self, demo: bool) -> Result<Vec<AccountBalance>> {
        self.inner.before_query().await?;
        Ok(self
            .inner
            .dataset(demo)
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .balances
            .clone())
    }

    async fn query_snapshots(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        demo: bool,
    ) -> Result<Vec<BalanceSnapshot>> {
        self.inner.before_query().await?;
        let mut rows: Vec<BalanceSnapshot> = self
            .inner
            .dataset(demo)
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshots
            .iter()
            .filter(|s| s.snapshot_date >= start && s.snapshot_date <= end)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.snapshot_date.cmp(&a.snapshot_date));
        Ok(rows)
    }
}

impl ChangeFeed for MemoryStore {
    fn subscribe_table_changes(
        &self,
        table: ChangeTable,
        user_id: &str,
        on_change: TableChangeCallback,
    ) -> Result<Subscription> {
        self.inner.feed.subscribe_table_changes(table, user_id, on_change)
    }
}
