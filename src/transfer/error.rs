//! Transfer error surface.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::{AccountId, StoreError};
use crate::lock::LockError;

/// Everything a transfer or a locked read can fail with.
///
/// A lock miss and a business-rule violation are deliberately the same
/// shape: distinct variants of one tagged type, rather than one soft `None`
/// and one raised exception.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("{account} has insufficient funds: balance {balance}, requested {amount}")]
    InsufficientFunds {
        account: AccountId,
        balance: Decimal,
        amount: Decimal,
    },

    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    #[error("account store error: {0}")]
    Store(#[from] StoreError),
}

impl TransferError {
    /// Stable machine-readable code for callers that map errors onward.
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TransferError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TransferError::Lock(_) => "LOCK_UNAVAILABLE",
            TransferError::Store(_) => "STORE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransferError::InvalidAmount.code(), "INVALID_AMOUNT");
        assert_eq!(
            TransferError::AccountNotFound("acc-1".to_string()).code(),
            "ACCOUNT_NOT_FOUND"
        );
        assert_eq!(
            TransferError::Lock(LockError::EmptyKeySet).code(),
            "LOCK_UNAVAILABLE"
        );
    }

    #[test]
    fn test_display() {
        let err = TransferError::InsufficientFunds {
            account: "acc-1".to_string(),
            balance: dec!(10),
            amount: dec!(25),
        };
        assert_eq!(
            err.to_string(),
            "acc-1 has insufficient funds: balance 10, requested 25"
        );
    }
}
