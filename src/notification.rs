//! Transfer notifications.
//!
//! Delivery is fire-and-forget: a notification that cannot be delivered must
//! never abort the transfer that produced it, so the contract is infallible
//! and implementations swallow their own failures.

use async_trait::async_trait;
use tracing::info;

use crate::account::Account;

/// Outbound notification boundary.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Notify the account holder about a transfer event.
    async fn notify(&self, account: &Account, message: &str);
}

/// Default emitter: writes the notification to the tracing pipeline with the
/// account snapshot as a JSON payload. Actual delivery transport lives
/// outside this crate.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationService for TracingNotifier {
    async fn notify(&self, account: &Account, message: &str) {
        let payload =
            serde_json::to_string(account).unwrap_or_else(|_| account.account_id.clone());
        info!(target: "fundlock::notifications", account = %payload, message, "notify");
    }
}
