//! Account storage boundary.
//!
//! The coordinator and facade only consume the [`AccountStore`] contract;
//! [`InMemoryAccountStore`] is the reference backend. Implementations must be
//! thread-safe for single-key get/save. Cross-account consistency is the lock
//! manager's job, never the store's.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;

use super::models::{Account, AccountId};

/// Storage failures surfaced by [`AccountStore`] implementations and the
/// transfer log store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("account already exists: {0}")]
    DuplicateAccount(AccountId),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Keyed account storage.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fetch an account. Absence is a valid outcome, not an error.
    async fn get(&self, id: &AccountId) -> Result<Option<Account>, StoreError>;

    /// Persist the account, overwriting any existing state for its id.
    async fn save(&self, account: &Account) -> Result<(), StoreError>;

    /// Insert a brand-new account.
    ///
    /// # Errors
    /// `DuplicateAccount` if the id is already present.
    async fn create(&self, account: Account) -> Result<(), StoreError>;
}

/// DashMap-backed account store.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<AccountId, Account>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, account: &Account) -> Result<(), StoreError> {
        self.accounts
            .insert(account.account_id.clone(), account.clone());
        Ok(())
    }

    async fn create(&self, account: Account) -> Result<(), StoreError> {
        match self.accounts.entry(account.account_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateAccount(account.account_id)),
            Entry::Vacant(slot) => {
                slot.insert(account);
                Ok(())
            }
        }
    }
}
