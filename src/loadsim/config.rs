use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables of the load simulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadSimConfig {
    /// Relative weight of "create a new entry" cycles
    pub create_weight: u32,
    /// Relative weight of "modify an existing entry" cycles
    pub modify_weight: u32,
    /// Upper bound of the random pause between cycles
    pub max_pause_ms: u64,
    /// Suffixed variants (`name0`..`nameN-1`) protected per exception
    pub exception_variants: usize,
    /// Bytes removed from an entry when it shrinks
    pub shrink_bytes: usize,
}

impl Default for LoadSimConfig {
    fn default() -> Self {
        Self {
            create_weight: 100,
            modify_weight: 1201,
            max_pause_ms: 4_000,
            exception_variants: 1_000,
            shrink_bytes: 300,
        }
    }
}

impl LoadSimConfig {
    pub fn max_pause(&self) -> Duration {
        Duration::from_millis(self.max_pause_ms)
    }
}
