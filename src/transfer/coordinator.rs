//! Transfer coordinator.
//!
//! Drives the debit/credit sequence as a logged, recoverable operation:
//! acquire both account locks, write-ahead-log each step, mutate the
//! accounts, then complete, or compensate whatever was already applied.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::account::{Account, AccountId, AccountStore};
use crate::lock::LockManager;
use crate::notification::NotificationService;

use super::error::TransferError;
use super::log::{TransferLog, TransferLogStore};
use super::status::TransferStatus;

/// How a rollback ended.
///
/// The coordinator logs this instead of raising it: an error thrown from
/// rollback would mask the failure that triggered the rollback in the first
/// place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// No balance mutation had been applied; only the log was finalized.
    Clean,
    /// Every applied mutation was reversed.
    Compensated,
    /// Some applied mutations were reversed, at least one was not.
    Partial,
    /// Something had been applied and none of it could be reversed.
    Failed,
}

impl RollbackOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RollbackOutcome::Clean => "CLEAN",
            RollbackOutcome::Compensated => "COMPENSATED",
            RollbackOutcome::Partial => "PARTIAL",
            RollbackOutcome::Failed => "FAILED",
        }
    }
}

impl fmt::Display for RollbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one single-account compensation attempt.
enum Compensation {
    Reversed,
    /// The timestamp guard says the logged mutation never reached the store.
    NotApplied,
    Failed,
}

/// Orchestrates two-account transfers over the lock manager, the account
/// store, and the transfer log.
pub struct TransferCoordinator {
    locks: Arc<LockManager>,
    accounts: Arc<dyn AccountStore>,
    transfer_log: Arc<TransferLogStore>,
    notifier: Arc<dyn NotificationService>,
    lock_attempts: u32,
}

impl TransferCoordinator {
    pub fn new(
        locks: Arc<LockManager>,
        accounts: Arc<dyn AccountStore>,
        transfer_log: Arc<TransferLogStore>,
        notifier: Arc<dyn NotificationService>,
        lock_attempts: u32,
    ) -> Self {
        Self {
            locks,
            accounts,
            transfer_log,
            notifier,
            lock_attempts,
        }
    }

    /// Move `amount` from `from` to `to`.
    ///
    /// All-or-nothing from the caller's perspective: on any error past lock
    /// acquisition the accounts end at their pre-transfer balances (see
    /// [`Self::rollback`] for the one caveat) and the log entry ends
    /// `FAILED`. A self-transfer (`from == to`) completes with a net balance
    /// change of zero.
    ///
    /// # Errors
    /// - `InvalidAmount` for a non-positive amount; nothing touched
    /// - `AccountNotFound` before any lock work when an id is unknown
    /// - `Lock` when the retry budget is spent; nothing mutated
    /// - `InsufficientFunds` after notifying the debtor
    /// - `Store` when a balance write fails mid-flight, after compensation
    pub async fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
    ) -> Result<(), TransferError> {
        if amount <= Decimal::ZERO {
            return Err(TransferError::InvalidAmount);
        }
        // Resolve both ids before taking locks: an unknown account must not
        // cost anyone contention.
        self.require_exists(from).await?;
        self.require_exists(to).await?;

        let token = self
            .locks
            .acquire(&[from.clone(), to.clone()], self.lock_attempts)
            .await?;

        let mut log = self.transfer_log.create(from, to, amount);
        debug!(transfer_id = %log.id, %from, %to, %amount, "transfer started");

        let result = self.apply(&mut log, amount).await;

        if let Err(ref err) = result {
            let outcome = self.rollback(&mut log, amount).await;
            warn!(
                transfer_id = %log.id,
                error = %err,
                outcome = %outcome,
                "transfer rolled back"
            );
        }

        // Release runs on every path; a failure here is logged and must not
        // displace the transfer's own result.
        if let Err(release_err) = self.locks.release(&token) {
            error!(transfer_id = %log.id, error = %release_err, "lock release failed");
        }

        result
    }

    async fn require_exists(&self, id: &AccountId) -> Result<(), TransferError> {
        match self.accounts.get(id).await? {
            Some(_) => Ok(()),
            None => Err(TransferError::AccountNotFound(id.clone())),
        }
    }

    async fn fetch(&self, id: &AccountId) -> Result<Account, TransferError> {
        self.accounts
            .get(id)
            .await?
            .ok_or_else(|| TransferError::AccountNotFound(id.clone()))
    }

    /// The lock-held critical section: funds check, debit, credit,
    /// completion.
    ///
    /// Each mutation is a log-then-mutate pair: the status describing a
    /// step is persisted before that step's account write, so
    /// [`Self::rollback`] can read back exactly how far the attempt got.
    async fn apply(&self, log: &mut TransferLog, amount: Decimal) -> Result<(), TransferError> {
        // Fresh read under the lock; the caller's view may be stale.
        let mut from = self.fetch(&log.from).await?;
        if from.balance < amount {
            self.notifier
                .notify(
                    &from,
                    &format!("Transfer of {amount} rejected: insufficient funds"),
                )
                .await;
            return Err(TransferError::InsufficientFunds {
                account: from.account_id.clone(),
                balance: from.balance,
                amount,
            });
        }

        log.advance(TransferStatus::DebitFromAccount);
        self.transfer_log.save(log)?;
        from.balance -= amount;
        from.touch();
        self.accounts.save(&from).await?;

        // Re-read the credit side only after the debit is persisted: for a
        // self-transfer the destination is the account just debited.
        let mut to = self.fetch(&log.to).await?;
        log.advance(TransferStatus::CreditToAccount);
        self.transfer_log.save(log)?;
        to.balance += amount;
        to.touch();
        self.accounts.save(&to).await?;

        log.advance(TransferStatus::Completed);
        self.transfer_log.save(log)?;

        info!(
            transfer_id = %log.id,
            from = %log.from,
            to = %log.to,
            %amount,
            "transfer completed"
        );
        self.notifier
            .notify(&from, &format!("Debited by {amount}"))
            .await;
        self.notifier
            .notify(&to, &format!("Credited by {amount}"))
            .await;
        Ok(())
    }

    /// Compensate whatever the failed attempt already applied.
    ///
    /// Inspects the last logged status: a logged debit refunds the source,
    /// a logged credit additionally claws back the destination. Each account
    /// is re-fetched first and only corrected when its `updated_at` is at or
    /// after the attempt's opening stamp; an account older than that never
    /// received the logged mutation, and "correcting" it would corrupt an
    /// untouched balance.
    ///
    /// Never returns an error. Compensation is best-effort and the log
    /// always ends `FAILED`.
    async fn rollback(&self, log: &mut TransferLog, amount: Decimal) -> RollbackOutcome {
        let opened_at = log.created_at;
        let status = log.status;

        let mut attempts = Vec::new();
        if matches!(
            status,
            TransferStatus::DebitFromAccount | TransferStatus::CreditToAccount
        ) {
            attempts.push(self.compensate(&log.from, amount, opened_at).await);
        }
        if status == TransferStatus::CreditToAccount {
            attempts.push(self.compensate(&log.to, -amount, opened_at).await);
        }

        log.advance(TransferStatus::Failed);
        if let Err(err) = self.transfer_log.save(log) {
            error!(transfer_id = %log.id, error = %err, "could not mark transfer log FAILED");
        }

        let applied: Vec<&Compensation> = attempts
            .iter()
            .filter(|c| !matches!(c, Compensation::NotApplied))
            .collect();
        if applied.is_empty() {
            return RollbackOutcome::Clean;
        }
        let reversed = applied
            .iter()
            .filter(|c| matches!(c, Compensation::Reversed))
            .count();
        match reversed {
            n if n == applied.len() => RollbackOutcome::Compensated,
            0 => RollbackOutcome::Failed,
            _ => RollbackOutcome::Partial,
        }
    }

    /// Undo one account's share of the failed transfer by `delta`.
    async fn compensate(
        &self,
        id: &AccountId,
        delta: Decimal,
        opened_at: DateTime<Utc>,
    ) -> Compensation {
        let mut account = match self.accounts.get(id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                warn!(account = %id, "account vanished during rollback");
                return Compensation::Failed;
            }
            Err(err) => {
                warn!(account = %id, error = %err, "could not re-fetch account during rollback");
                return Compensation::Failed;
            }
        };

        // Timestamp guard: a store copy predating the attempt means the
        // logged mutation was never persisted for this account.
        if account.updated_at < opened_at {
            return Compensation::NotApplied;
        }

        account.balance += delta;
        account.touch();
        match self.accounts.save(&account).await {
            Ok(()) => {
                debug!(account = %id, %delta, "compensated");
                Compensation::Reversed
            }
            Err(err) => {
                warn!(account = %id, error = %err, "compensation write failed");
                Compensation::Failed
            }
        }
    }
}
