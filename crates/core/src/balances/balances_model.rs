//! Account balance domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of financial account.
///
/// Serialized with the display names used by the backing tables
/// ("Checking", "Credit Card", ...). Unknown names round-trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountType {
    Checking,
    Savings,
    Cash,
    Investment,
    CreditCard,
    Credit,
    Loan,
    Other(String),
}

impl AccountType {
    /// Liabilities never count towards bank totals.
    pub fn is_liability(&self) -> bool {
        matches!(
            self,
            AccountType::CreditCard | AccountType::Credit | AccountType::Loan
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            AccountType::Checking => "Checking",
            AccountType::Savings => "Savings",
            AccountType::Cash => "Cash",
            AccountType::Investment => "Investment",
            AccountType::CreditCard => "Credit Card",
            AccountType::Credit => "Credit",
            AccountType::Loan => "Loan",
            AccountType::Other(name) => name,
        }
    }
}

impl From<String> for AccountType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "checking" => AccountType::Checking,
            "savings" => AccountType::Savings,
            "cash" => AccountType::Cash,
            "investment" => AccountType::Investment,
            "credit card" | "credit_card" => AccountType::CreditCard,
            "credit" => AccountType::Credit,
            "loan" => AccountType::Loan,
            _ => AccountType::Other(value),
        }
    }
}

impl From<&str> for AccountType {
    fn from(value: &str) -> Self {
        AccountType::from(value.to_string())
    }
}

impl From<AccountType> for String {
    fn from(value: AccountType) -> Self {
        value.as_str().to_string()
    }
}

/// Current balance of one account, as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub account_id: String,
    pub account_type: AccountType,
    pub current_balance: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl AccountBalance {
    pub fn new(
        account_id: impl Into<String>,
        account_type: impl Into<AccountType>,
        current_balance: Decimal,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            account_type: account_type.into(),
            current_balance,
            last_updated,
        }
    }

    pub fn is_liability(&self) -> bool {
        self.account_type.is_liability()
    }
}
