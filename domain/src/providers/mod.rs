//! Provider capability table.
//!
//! Each supported AI CLI differs in whether it can run subagents in
//! parallel. The difference collapses into a single number, the effective
//! concurrency bound; the rest of the system never branches on the provider.
//!
//! | Provider | Binary | Subagents | Max parallel |
//! |----------|--------|-----------|--------------|
//! | claude   | `claude` | yes | 10 |
//! | codex    | `codex`  | no  | 1  |
//! | gemini   | `gemini` | no  | 1  |

use serde::{Deserialize, Serialize};

/// Supported AI CLI providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Claude,
    Codex,
    Gemini,
}

/// Static capabilities of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Executable name looked up on `PATH`
    pub binary: &'static str,
    pub supports_subagents: bool,
    pub supports_parallel: bool,
    pub max_parallel: usize,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Claude, Provider::Codex, Provider::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Claude => "claude",
            Provider::Codex => "codex",
            Provider::Gemini => "gemini",
        }
    }

    pub fn capabilities(&self) -> ProviderCapabilities {
        match self {
            Provider::Claude => ProviderCapabilities {
                binary: "claude",
                supports_subagents: true,
                supports_parallel: true,
                max_parallel: 10,
            },
            Provider::Codex => ProviderCapabilities {
                binary: "codex",
                supports_subagents: false,
                supports_parallel: false,
                max_parallel: 1,
            },
            Provider::Gemini => ProviderCapabilities {
                binary: "gemini",
                supports_subagents: false,
                supports_parallel: false,
                max_parallel: 1,
            },
        }
    }

    /// Arguments for a non-interactive, fully autonomous invocation with
    /// `prompt` as the task.
    pub fn autonomous_args(&self, prompt: &str) -> Vec<String> {
        let args: &[&str] = match self {
            Provider::Claude => &["--dangerously-skip-permissions", "-p"],
            Provider::Codex => &["exec", "--full-auto"],
            Provider::Gemini => &["--yolo", "-p"],
        };
        args.iter()
            .map(|a| a.to_string())
            .chain(std::iter::once(prompt.to_string()))
            .collect()
    }

    /// Concurrency bound for this provider given the configured maximum.
    ///
    /// Providers without subagent support run in degraded mode (1).
    pub fn effective_concurrency(&self, configured: usize) -> usize {
        let caps = self.capabilities();
        if !caps.supports_subagents || !caps.supports_parallel {
            return 1;
        }
        configured.clamp(1, caps.max_parallel)
    }

    pub fn is_degraded(&self) -> bool {
        !self.capabilities().supports_subagents
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "claude-code" => Ok(Provider::Claude),
            "codex" | "openai" => Ok(Provider::Codex),
            "gemini" | "google" => Ok(Provider::Gemini),
            _ => Err(format!(
                "Unknown provider: {s}. Valid: claude, codex, gemini"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_runs_in_parallel_up_to_cap() {
        assert_eq!(Provider::Claude.effective_concurrency(4), 4);
        assert_eq!(Provider::Claude.effective_concurrency(50), 10);
        assert_eq!(Provider::Claude.effective_concurrency(0), 1);
    }

    #[test]
    fn test_degraded_providers_are_sequential() {
        for provider in [Provider::Codex, Provider::Gemini] {
            assert!(provider.is_degraded());
            assert_eq!(provider.effective_concurrency(8), 1);
        }
        assert!(!Provider::Claude.is_degraded());
    }

    #[test]
    fn test_autonomous_args_end_with_prompt() {
        let args = Provider::Codex.autonomous_args("fix the build");
        assert_eq!(args, vec!["exec", "--full-auto", "fix the build"]);
        assert_eq!(Provider::Claude.autonomous_args("x").last().unwrap(), "x");
    }

    #[test]
    fn test_parse_provider() {
        assert_eq!("Claude".parse::<Provider>().ok(), Some(Provider::Claude));
        assert_eq!("gemini".parse::<Provider>().ok(), Some(Provider::Gemini));
        assert!("openai".parse::<Provider>().is_err());
    }
}
