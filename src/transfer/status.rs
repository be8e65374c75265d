//! Transfer lifecycle states.

use std::fmt;

/// Progress marker persisted to the transfer log before each balance
/// mutation, so recovery can tell exactly how far an attempt got.
///
/// ```text
/// START → DEBIT_FROM_ACCOUNT → CREDIT_TO_ACCOUNT → COMPLETED
///    \            \                    \
///     `────────────`────────────────────`──(rollback)──→ FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStatus {
    /// Attempt recorded, no balance touched yet.
    Start,
    /// Debit of the source account logged, then applied.
    DebitFromAccount,
    /// Credit of the destination account logged, then applied.
    CreditToAccount,
    /// Terminal: both balances moved.
    Completed,
    /// Terminal: attempt rolled back.
    Failed,
}

impl TransferStatus {
    /// Terminal states accept no further transitions.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Start => "START",
            TransferStatus::DebitFromAccount => "DEBIT_FROM_ACCOUNT",
            TransferStatus::CreditToAccount => "CREDIT_TO_ACCOUNT",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
