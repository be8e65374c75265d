//! Accounts: domain model, storage boundary, and the locked-read facade.

pub mod models;
pub mod service;
pub mod store;

pub use models::{Account, AccountId};
pub use service::AccountsService;
pub use store::{AccountStore, InMemoryAccountStore, StoreError};
