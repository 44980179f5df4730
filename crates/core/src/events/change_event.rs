//! Change event types.

use serde::{Deserialize, Serialize};

use crate::constants::{BALANCES_TABLE, TRANSACTIONS_TABLE};

/// Tables the engine watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Balances,
    Transactions,
}

impl ChangeTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            ChangeTable::Balances => BALANCES_TABLE,
            ChangeTable::Transactions => TRANSACTIONS_TABLE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Row-level notification delivered by a table change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableChange {
    pub table: ChangeTable,
    pub event_type: ChangeKind,
    /// Account touched by the write, when the feed reports it.
    pub account_scope: Option<String>,
}

/// A normalized change notification.
///
/// Delivery is unordered and at-least-once and payloads are not trusted:
/// every variant only means "re-fetch", never "here is the new value".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ChangeEvent {
    TableChange(TableChange),
    CustomEvent { payload: serde_json::Value },
    EmitterEvent { payload: serde_json::Value },
}

impl ChangeEvent {
    pub fn source(&self) -> InvalidationSource {
        match self {
            ChangeEvent::TableChange(change) => match change.table {
                ChangeTable::Balances => InvalidationSource::BalanceTable,
                ChangeTable::Transactions => InvalidationSource::TransactionTable,
            },
            ChangeEvent::CustomEvent { .. } => InvalidationSource::CustomEvent,
            ChangeEvent::EmitterEvent { .. } => InvalidationSource::Emitter,
        }
    }
}

/// Origin of an invalidation. Drives the debounce delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationSource {
    BalanceTable,
    TransactionTable,
    CustomEvent,
    Emitter,
    /// Explicit refresh request from a consumer.
    Manual,
}
