//! Row types owned by the memory store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Input for [`crate::MemoryStore::insert_transaction`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub account_id: String,
    /// Signed amount applied to the account balance.
    pub amount: Decimal,
    pub description: Option<String>,
}

impl NewTransaction {
    pub fn new(account_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_id: account_id.into(),
            amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub(crate) fn from_new(new_transaction: NewTransaction) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: new_transaction.account_id,
            amount: new_transaction.amount,
            description: new_transaction.description,
            created_at: Utc::now(),
        }
    }
}
