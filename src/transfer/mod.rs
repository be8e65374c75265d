//! Recoverable two-account transfers.
//!
//! # State machine
//!
//! ```text
//! START → DEBIT_FROM_ACCOUNT → CREDIT_TO_ACCOUNT → COMPLETED
//!    \            \                    \
//!     `────────────`────────────────────`──(rollback)──→ FAILED
//! ```
//!
//! # Safety invariants
//!
//! 1. Log-then-mutate: every status change is persisted before the account
//!    write it describes.
//! 2. Both account locks are held for the whole sequence and released on
//!    every exit path.
//! 3. Rollback never raises; the log always ends in a terminal state.

pub mod coordinator;
pub mod error;
pub mod log;
pub mod status;

pub use coordinator::{RollbackOutcome, TransferCoordinator};
pub use error::TransferError;
pub use log::{TransferLog, TransferLogStore};
pub use status::TransferStatus;
