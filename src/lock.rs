//! Advisory multi-key account locks.
//!
//! All-or-nothing exclusive acquisition over sets of account ids. Keys are
//! deduplicated and sorted before the first attempt, so any two overlapping
//! acquisitions contend for their shared ids in the same relative order and
//! no hold-and-wait cycle can form.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::account::AccountId;
use crate::config::LockConfig;

const KEY_SEP: &str = ":";

/// Lock acquisition and release failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// An acquisition with no keys is a failure, not a free pass into the
    /// critical section.
    #[error("no account ids to lock")]
    EmptyKeySet,

    #[error("could not lock [{keys}] within {attempts} attempts")]
    Exhausted { keys: String, attempts: u32 },

    #[error("cannot release [{keys}]: not all accounts are currently held")]
    NotHeld { keys: String },
}

/// Proof of one successful acquisition.
///
/// Encodes the exact key set that was marked held, in canonical order. The
/// token is derived from the sorted set alone, so acquiring `{a, b}` and
/// `{b, a}` produce equal tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockToken {
    keys: Vec<AccountId>,
}

impl LockToken {
    /// Account ids held under this token, in canonical order.
    pub fn keys(&self) -> &[AccountId] {
        &self.keys
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keys.join(KEY_SEP))
    }
}

/// In-process advisory lock table keyed by account id.
///
/// One mutex guards the table: "test all free, mark all held" and "check all
/// held, free all" are each a single critical section, so no caller ever
/// observes a partially updated table.
pub struct LockManager {
    held: Mutex<HashSet<AccountId>>,
    base_pause: Duration,
    max_pause: Duration,
}

impl LockManager {
    pub fn new(config: &LockConfig) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            base_pause: Duration::from_millis(config.base_pause_ms),
            max_pause: Duration::from_millis(config.max_pause_ms),
        }
    }

    /// Acquire every id in `ids` exclusively, or none of them.
    ///
    /// Ids are deduplicated and sorted before the first attempt. On
    /// contention the call sleeps and retries with a doubling pause, capped
    /// at the configured maximum, until the attempt budget is spent. The
    /// bounded wait is what keeps worst-case latency finite under
    /// contention: a starved caller gives up deterministically instead of
    /// spinning forever.
    ///
    /// # Errors
    /// - `EmptyKeySet` if `ids` is empty
    /// - `Exhausted` once the budget is spent; `max_attempts == 0` exhausts
    ///   without a single attempt
    pub async fn acquire(
        &self,
        ids: &[AccountId],
        max_attempts: u32,
    ) -> Result<LockToken, LockError> {
        if ids.is_empty() {
            return Err(LockError::EmptyKeySet);
        }
        // BTreeSet gives the canonical order and collapses duplicates.
        let keys: Vec<AccountId> = ids
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut pause = self.base_pause;
        let mut remaining = max_attempts;
        while remaining > 0 {
            remaining -= 1;
            if self.try_mark_held(&keys) {
                debug!(token = %keys.join(KEY_SEP), "locks acquired");
                return Ok(LockToken { keys });
            }
            if remaining == 0 {
                break;
            }
            tokio::time::sleep(pause).await;
            pause = (pause * 2).min(self.max_pause);
        }

        warn!(
            keys = %keys.join(KEY_SEP),
            attempts = max_attempts,
            "lock budget exhausted"
        );
        Err(LockError::Exhausted {
            keys: keys.join(KEY_SEP),
            attempts: max_attempts,
        })
    }

    /// Free every id named by `token`.
    ///
    /// Fails without freeing anything unless every id is currently held: a
    /// stale token, a token from another manager, or a second release of the
    /// same token all leave the table untouched.
    pub fn release(&self, token: &LockToken) -> Result<(), LockError> {
        let mut held = self.held.lock().unwrap();
        if !token.keys.iter().all(|key| held.contains(key)) {
            return Err(LockError::NotHeld {
                keys: token.to_string(),
            });
        }
        for key in &token.keys {
            held.remove(key);
        }
        debug!(token = %token, "locks released");
        Ok(())
    }

    /// Single atomic test-and-set over the whole key set.
    fn try_mark_held(&self, keys: &[AccountId]) -> bool {
        let mut held = self.held.lock().unwrap();
        if keys.iter().any(|key| held.contains(key)) {
            return false;
        }
        held.extend(keys.iter().cloned());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn manager() -> LockManager {
        LockManager::new(&LockConfig {
            base_pause_ms: 1,
            max_pause_ms: 4,
        })
    }

    fn ids(list: &[&str]) -> Vec<AccountId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let locks = manager();
        let token = locks.acquire(&ids(&["acc-1", "acc-2"]), 1).await.unwrap();
        locks.release(&token).unwrap();
    }

    #[tokio::test]
    async fn test_empty_key_set_is_an_error() {
        let locks = manager();
        assert_eq!(locks.acquire(&[], 1).await, Err(LockError::EmptyKeySet));
    }

    #[tokio::test]
    async fn test_zero_attempts_fails_without_acquiring() {
        let locks = manager();
        let result = locks.acquire(&ids(&["acc-1"]), 0).await;
        assert!(matches!(result, Err(LockError::Exhausted { .. })));

        // The id was never marked held.
        let token = locks.acquire(&ids(&["acc-1"]), 1).await.unwrap();
        locks.release(&token).unwrap();
    }

    #[tokio::test]
    async fn test_overlapping_set_blocked_while_held() {
        let locks = manager();
        let held = locks.acquire(&ids(&["acc-1"]), 1).await.unwrap();

        // Any set including the held id fails, and fails atomically: acc-2
        // must not be left marked held by the failed attempt.
        let result = locks.acquire(&ids(&["acc-1", "acc-2"]), 1).await;
        assert!(matches!(result, Err(LockError::Exhausted { .. })));
        let free = locks.acquire(&ids(&["acc-2"]), 1).await.unwrap();

        locks.release(&free).unwrap();
        locks.release(&held).unwrap();
    }

    #[tokio::test]
    async fn test_token_is_input_order_insensitive() {
        let locks = manager();
        let ab = locks.acquire(&ids(&["a", "b"]), 1).await.unwrap();
        locks.release(&ab).unwrap();
        let ba = locks.acquire(&ids(&["b", "a"]), 1).await.unwrap();
        locks.release(&ba).unwrap();

        assert_eq!(ab, ba);
        assert_eq!(ab.to_string(), "a:b");
    }

    #[tokio::test]
    async fn test_duplicate_ids_collapse() {
        let locks = manager();
        let token = locks.acquire(&ids(&["acc-1", "acc-1"]), 1).await.unwrap();
        assert_eq!(token.keys().len(), 1);
        locks.release(&token).unwrap();
    }

    #[tokio::test]
    async fn test_reacquire_after_release() {
        let locks = manager();
        let first = locks.acquire(&ids(&["acc-1"]), 1).await.unwrap();
        assert!(locks.acquire(&ids(&["acc-1"]), 1).await.is_err());

        locks.release(&first).unwrap();
        let second = locks.acquire(&ids(&["acc-1"]), 1).await.unwrap();
        locks.release(&second).unwrap();
    }

    #[tokio::test]
    async fn test_double_release_fails() {
        let locks = manager();
        let token = locks.acquire(&ids(&["acc-1", "acc-2"]), 1).await.unwrap();
        locks.release(&token).unwrap();

        let result = locks.release(&token);
        assert!(matches!(result, Err(LockError::NotHeld { .. })));
    }

    #[tokio::test]
    async fn test_partial_hold_release_frees_nothing() {
        let locks = manager();
        let pair = locks.acquire(&ids(&["acc-1", "acc-2"]), 1).await.unwrap();
        locks.release(&pair).unwrap();

        // Re-hold only one of the two ids; the stale pair token must fail
        // and must not free acc-1 as a side effect.
        let single = locks.acquire(&ids(&["acc-1"]), 1).await.unwrap();
        assert!(matches!(locks.release(&pair), Err(LockError::NotHeld { .. })));
        assert!(locks.acquire(&ids(&["acc-1"]), 1).await.is_err());

        locks.release(&single).unwrap();
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_holder_releases() {
        let locks = Arc::new(manager());
        let held = locks.acquire(&ids(&["acc-1"]), 1).await.unwrap();

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.acquire(&ids(&["acc-1"]), 50).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        locks.release(&held).unwrap();

        let token = contender.await.unwrap().unwrap();
        locks.release(&token).unwrap();
    }
}
