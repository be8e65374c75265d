//! Locked account access.
//!
//! Reads go through the same advisory locks as transfers, so a reader never
//! observes an account between a transfer's debit and credit. The trade is
//! availability: a read that cannot get the lock fails instead of returning
//! possibly mid-transfer state.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::error;

use crate::lock::LockManager;
use crate::transfer::{TransferCoordinator, TransferError};

use super::models::{Account, AccountId};
use super::store::{AccountStore, StoreError};

/// Facade over account admin, consistent reads, and transfers.
pub struct AccountsService {
    accounts: Arc<dyn AccountStore>,
    locks: Arc<LockManager>,
    coordinator: Arc<TransferCoordinator>,
    read_attempts: u32,
}

impl AccountsService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        locks: Arc<LockManager>,
        coordinator: Arc<TransferCoordinator>,
        read_attempts: u32,
    ) -> Self {
        Self {
            accounts,
            locks,
            coordinator,
            read_attempts,
        }
    }

    /// Register a new account.
    pub async fn create_account(&self, account: Account) -> Result<(), StoreError> {
        self.accounts.create(account).await
    }

    /// Read one account under its lock.
    ///
    /// An unknown id returns `Ok(None)` without touching the lock table;
    /// no point contending for an account that does not exist. A known id
    /// is locked with the configured retry budget, re-read, and released;
    /// failing to lock is an error, not a stale read.
    pub async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, TransferError> {
        if self.accounts.get(id).await?.is_none() {
            return Ok(None);
        }

        let token = self
            .locks
            .acquire(std::slice::from_ref(id), self.read_attempts)
            .await?;
        let result = self.accounts.get(id).await;
        if let Err(release_err) = self.locks.release(&token) {
            error!(account = %id, error = %release_err, "lock release failed after read");
        }
        Ok(result?)
    }

    /// Transfer `amount` between two accounts.
    pub async fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
    ) -> Result<(), TransferError> {
        self.coordinator.transfer(from, to, amount).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::InMemoryAccountStore;
    use crate::config::LockConfig;
    use crate::lock::LockError;
    use crate::notification::mock::RecordingNotifier;
    use crate::transfer::TransferLogStore;
    use rust_decimal_macros::dec;

    fn id(s: &str) -> AccountId {
        s.to_string()
    }

    fn service() -> (AccountsService, Arc<LockManager>) {
        let accounts: Arc<dyn AccountStore> = Arc::new(InMemoryAccountStore::new());
        let locks = Arc::new(LockManager::new(&LockConfig {
            base_pause_ms: 1,
            max_pause_ms: 2,
        }));
        let coordinator = Arc::new(TransferCoordinator::new(
            locks.clone(),
            accounts.clone(),
            Arc::new(TransferLogStore::new()),
            Arc::new(RecordingNotifier::new()),
            3,
        ));
        (
            AccountsService::new(accounts, locks.clone(), coordinator, 3),
            locks,
        )
    }

    #[tokio::test]
    async fn test_create_and_get_account() {
        let (service, _locks) = service();
        service
            .create_account(Account::with_balance("acc-1", dec!(50)))
            .await
            .unwrap();

        let account = service.get_account(&id("acc-1")).await.unwrap().unwrap();
        assert_eq!(account.balance, dec!(50));
    }

    #[tokio::test]
    async fn test_get_unknown_account_is_none() {
        let (service, _locks) = service();
        assert!(service.get_account(&id("ghost")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_account_rejected() {
        let (service, _locks) = service();
        service.create_account(Account::new("acc-1")).await.unwrap();

        let result = service.create_account(Account::new("acc-1")).await;
        assert_eq!(result, Err(StoreError::DuplicateAccount(id("acc-1"))));
    }

    #[tokio::test]
    async fn test_get_account_fails_while_locked() {
        let (service, locks) = service();
        service.create_account(Account::new("acc-1")).await.unwrap();

        let external = locks.acquire(&[id("acc-1")], 1).await.unwrap();
        let result = service.get_account(&id("acc-1")).await;
        assert!(matches!(
            result,
            Err(TransferError::Lock(LockError::Exhausted { .. }))
        ));

        // Released externally, the read works again.
        locks.release(&external).unwrap();
        assert!(service.get_account(&id("acc-1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_transfer_through_facade() {
        let (service, _locks) = service();
        service
            .create_account(Account::with_balance("acc-1", dec!(100)))
            .await
            .unwrap();
        service
            .create_account(Account::with_balance("acc-2", dec!(0)))
            .await
            .unwrap();

        service
            .transfer(&id("acc-1"), &id("acc-2"), dec!(25))
            .await
            .unwrap();

        assert_eq!(
            service
                .get_account(&id("acc-1"))
                .await
                .unwrap()
                .unwrap()
                .balance,
            dec!(75)
        );
        assert_eq!(
            service
                .get_account(&id("acc-2"))
                .await
                .unwrap()
                .unwrap()
                .balance,
            dec!(25)
        );
    }
}
