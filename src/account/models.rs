//! Account domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account identifier.
///
/// Lexicographic ordering of ids doubles as the canonical lock acquisition
/// order, so the alias is deliberately a plain `String`.
pub type AccountId = String;

/// A single account: identity, balance, and the timestamp of the last
/// persisted mutation.
///
/// `updated_at` is not cosmetic. Rollback compares it against the transfer
/// log's timestamps to decide whether a logged debit or credit actually
/// reached the store before compensating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    pub balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// New account with a zero balance.
    pub fn new(account_id: impl Into<AccountId>) -> Self {
        Self::with_balance(account_id, Decimal::ZERO)
    }

    pub fn with_balance(account_id: impl Into<AccountId>, balance: Decimal) -> Self {
        Self {
            account_id: account_id.into(),
            balance,
            updated_at: Utc::now(),
        }
    }

    /// Re-stamp `updated_at`. Call before persisting a mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
