//! Configuration file loading for autopilot
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. CLI flags (applied by the caller as overrides)
//! 2. Environment: `AUTOPILOT_` prefix, `__` for nesting (`AUTOPILOT_RETRY__MAX_RETRIES=3`)
//! 3. `--config <path>` specified file
//! 4. Project root: `./autopilot.toml` or `./.autopilot.toml`
//! 5. Global: `$XDG_CONFIG_HOME/autopilot/config.toml`
//! 6. Default values

mod file_config;
mod issue;
mod loader;

pub use file_config::{
    FileAgentConfig, FileConfig, FileCouncilConfig, FileProviderConfig, FileQueueConfig,
    FileRetryConfig, FileSessionConfig,
};
pub use issue::{ConfigIssue, ConfigIssueCode, Severity};
pub use loader::{ConfigError, ConfigLoader, ConfigOverrides};
