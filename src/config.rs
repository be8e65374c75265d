use serde::{Deserialize, Serialize};
use std::fs;

/// Top-level configuration, loaded from `config/{env}.yaml`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub use_json: bool,
    pub rotation: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "./logs".to_string(),
            file: "fundlock.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
        }
    }
}

/// Lock retry pacing.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LockConfig {
    /// First backoff pause after a failed acquisition attempt.
    pub base_pause_ms: u64,
    /// Ceiling for the doubling pause. Keeps the total wait bounded at high
    /// attempt budgets.
    pub max_pause_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            base_pause_ms: 100,
            max_pause_ms: 1000,
        }
    }
}

/// Retry budgets for lock acquisition.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransferConfig {
    /// Attempts to lock both accounts of a transfer.
    pub lock_retry_attempts: u32,
    /// Attempts to lock a single account for a consistent read.
    pub read_retry_attempts: u32,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            lock_retry_attempts: 300,
            read_retry_attempts: 300,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}
