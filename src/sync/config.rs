use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default time between two reconciliation passes
pub const DEFAULT_INTERVAL_MS: u64 = 5_000;

/// Shortest interval the sync service accepts
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Longest interval the sync service accepts
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Tunables of the background sync service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Milliseconds between reconciliation passes
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

impl SyncConfig {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Interval between passes, clamped to [`MIN_INTERVAL`]..=[`MAX_INTERVAL`]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms).clamp(MIN_INTERVAL, MAX_INTERVAL)
    }
}
