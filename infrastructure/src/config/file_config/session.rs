//! Session configuration from TOML (`[session]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ```toml
/// [session]
/// max_iterations = 1000
/// max_retries = 50             # retries across all tasks before giving up
/// state_dir = ".autopilot"
/// poll_interval_ms = 500
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSessionConfig {
    pub max_iterations: u64,
    pub max_retries: u32,
    pub state_dir: PathBuf,
    pub poll_interval_ms: u64,
}

impl Default for FileSessionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_retries: 50,
            state_dir: PathBuf::from(".autopilot"),
            poll_interval_ms: 500,
        }
    }
}
