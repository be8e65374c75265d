//! fundlock - deadlock-free in-memory funds transfers.
//!
//! Moves funds between two in-memory account balances under advisory
//! multi-key locks, with a write-ahead transfer log so a failure partway
//! through a transfer is compensated instead of leaving a half-applied
//! debit behind.
//!
//! # Modules
//!
//! - [`lock`] - Advisory multi-key lock manager (canonical order, all-or-nothing)
//! - [`account`] - Account model, storage boundary, and the locked-read facade
//! - [`transfer`] - Transfer log, status machine, and the recoverable coordinator
//! - [`notification`] - Fire-and-forget transfer notifications
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing setup

pub mod account;
pub mod config;
pub mod lock;
pub mod logging;
pub mod notification;
pub mod transfer;

// Convenient re-exports at crate root
pub use account::{Account, AccountId, AccountStore, AccountsService, InMemoryAccountStore, StoreError};
pub use config::{AppConfig, LockConfig, LogConfig, TransferConfig};
pub use lock::{LockError, LockManager, LockToken};
pub use notification::{NotificationService, TracingNotifier};
pub use transfer::{
    RollbackOutcome, TransferCoordinator, TransferError, TransferLog, TransferLogStore,
    TransferStatus,
};
