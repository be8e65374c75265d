//! Transfer log entries and their in-memory store.

use std::fmt;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::account::{AccountId, StoreError};

use super::status::TransferStatus;

/// Recovery record for the latest transfer attempt between one ordered
/// (from, to) pair.
#[derive(Debug, Clone)]
pub struct TransferLog {
    pub id: Ulid,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
    pub status: TransferStatus,
    /// When this attempt was opened. Rollback uses this as the threshold for
    /// deciding whether an account write belongs to the attempt.
    pub created_at: DateTime<Utc>,
    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
}

impl TransferLog {
    fn new(from: AccountId, to: AccountId, amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Ulid::new(),
            from,
            to,
            amount,
            status: TransferStatus::Start,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `status` and re-stamp `updated_at`.
    pub fn advance(&mut self, status: TransferStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for TransferLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transfer[{}] {} -> {} amount={} status={}",
            self.id, self.from, self.to, self.amount, self.status
        )
    }
}

/// Last-writer-wins store of the newest attempt per ordered (from, to) pair.
///
/// Bookkeeping for recovery, not a transfer history: a new attempt between
/// the same ordered pair replaces the previous record.
#[derive(Default)]
pub struct TransferLogStore {
    entries: DashMap<(AccountId, AccountId), TransferLog>,
}

impl TransferLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh attempt: construct a `START` entry for the pair and
    /// persist it immediately.
    pub fn create(&self, from: &AccountId, to: &AccountId, amount: Decimal) -> TransferLog {
        let entry = TransferLog::new(from.clone(), to.clone(), amount);
        self.entries
            .insert((entry.from.clone(), entry.to.clone()), entry.clone());
        entry
    }

    /// Upsert the entry under its (from, to) key.
    pub fn save(&self, entry: &TransferLog) -> Result<(), StoreError> {
        self.entries
            .insert((entry.from.clone(), entry.to.clone()), entry.clone());
        Ok(())
    }

    /// Latest recorded attempt for the ordered pair, if any.
    pub fn latest(&self, from: &AccountId, to: &AccountId) -> Option<TransferLog> {
        self.entries
            .get(&(from.clone(), to.clone()))
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
