//! Configuration for the booking application.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use slotbook_runtime::RetryPolicy;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cleanup sweep configuration
    pub sweep: SweepConfig,
    /// Notification delivery configuration
    pub notifications: NotificationConfig,
    /// Shutdown timeout in seconds for draining background workers
    pub shutdown_timeout: u64,
}

/// Cleanup sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between sweep runs (default: 900, fifteen minutes)
    pub interval_secs: u64,
    /// Hours past `end` before a stuck APPROVED row is purged (default: 72)
    pub approved_grace_hours: u64,
}

/// Notification delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Retries before a notification is dropped (default: 3)
    pub max_retries: usize,
    /// Initial backoff in milliseconds (default: 200)
    pub initial_delay_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            sweep: SweepConfig {
                interval_secs: env::var("SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(900),
                approved_grace_hours: env::var("SWEEP_APPROVED_GRACE_HOURS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(72),
            },
            notifications: NotificationConfig {
                max_retries: env::var("NOTIFY_MAX_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3),
                initial_delay_ms: env::var("NOTIFY_INITIAL_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(200),
            },
            shutdown_timeout: env::var("SHUTDOWN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        }
    }
}

impl SweepConfig {
    /// Interval between sweep runs as a duration
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Grace window as a chrono duration for expiry arithmetic
    #[must_use]
    pub fn approved_grace(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::try_from(self.approved_grace_hours).unwrap_or(72))
    }
}

impl NotificationConfig {
    /// The retry policy notifications are delivered under
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.max_retries)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .build()
    }
}
