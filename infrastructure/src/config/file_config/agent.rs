//! Agent configuration from TOML (`[agent]` section)

use serde::{Deserialize, Serialize};

/// ```toml
/// [agent]
/// max_internal_retries = 2     # retries inside one agent before escalating
/// task_timeout_secs = 540      # budget for one provider invocation
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    pub max_internal_retries: u32,
    pub task_timeout_secs: u64,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        Self {
            max_internal_retries: 2,
            task_timeout_secs: 540,
        }
    }
}
