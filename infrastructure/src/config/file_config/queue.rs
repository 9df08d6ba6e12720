//! Queue configuration from TOML (`[queue]` section)

use serde::{Deserialize, Serialize};

/// ```toml
/// [queue]
/// stall_timeout_secs = 1800   # in_progress longer than this is stalled
/// sweep_interval_secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileQueueConfig {
    pub stall_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for FileQueueConfig {
    fn default() -> Self {
        Self {
            stall_timeout_secs: 1800,
            sweep_interval_secs: 30,
        }
    }
}
