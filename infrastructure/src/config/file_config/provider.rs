//! Provider configuration from TOML (`[provider]` section)

use crate::config::issue::{ConfigIssue, Severity};
use autopilot_domain::Provider;
use serde::{Deserialize, Serialize};

/// Raw provider configuration from TOML
///
/// # Example
///
/// ```toml
/// [provider]
/// name = "claude"          # "claude", "codex" or "gemini"
/// max_parallel = 4
/// binary = "/opt/bin/claude"
/// args = ["--model", "opus"]
/// ```
///
/// `binary` replaces the executable looked up on `PATH`; `args` are
/// inserted before the provider's autonomous-mode arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    pub name: String,
    /// Agents running at once, before the provider's own bound
    pub max_parallel: usize,
    pub binary: Option<String>,
    pub args: Vec<String>,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            name: "claude".to_string(),
            max_parallel: 4,
            binary: None,
            args: Vec::new(),
        }
    }
}

impl FileProviderConfig {
    /// An unknown provider is fatal: nothing could run the tasks.
    pub fn parse_provider(&self) -> (Provider, Vec<ConfigIssue>) {
        match self.name.parse::<Provider>() {
            Ok(provider) => (provider, vec![]),
            Err(_) => {
                let valid: Vec<&str> = Provider::ALL.iter().map(|p| p.as_str()).collect();
                let issue = ConfigIssue::invalid_enum(
                    Severity::Error,
                    "provider.name",
                    &self.name,
                    &valid,
                    format!(
                        "provider.name: unknown provider '{}' (valid: {})",
                        self.name,
                        valid.join(", ")
                    ),
                );
                (Provider::default(), vec![issue])
            }
        }
    }

    pub fn parse_max_parallel(&self, provider: Provider) -> (usize, Vec<ConfigIssue>) {
        if self.max_parallel == 0 {
            return (
                1,
                vec![ConfigIssue::out_of_range(
                    Severity::Error,
                    "provider.max_parallel",
                    "provider.max_parallel must be at least 1",
                )],
            );
        }
        let effective = provider.effective_concurrency(self.max_parallel);
        let mut issues = vec![];
        if effective < self.max_parallel {
            issues.push(ConfigIssue::out_of_range(
                Severity::Warning,
                "provider.max_parallel",
                format!(
                    "provider.max_parallel = {} exceeds what {} supports; running {} agent(s) at once",
                    self.max_parallel, provider, effective
                ),
            ));
        }
        (self.max_parallel, issues)
    }

    /// Executable to invoke: the override, or the provider's own binary.
    pub fn binary_for(&self, provider: Provider) -> String {
        self.binary
            .clone()
            .unwrap_or_else(|| provider.capabilities().binary.to_string())
    }
}
