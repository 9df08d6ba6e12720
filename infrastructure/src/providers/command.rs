//! One-shot provider CLI invocation

use autopilot_domain::{Provider, excerpt};
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt carried in an error
const STDERR_EXCERPT: usize = 2000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    #[error("Failed to spawn {binary}: {message}")]
    Spawn { binary: String, message: String },

    #[error("{binary} exited with {status}: {stderr}")]
    Exit {
        binary: String,
        status: String,
        stderr: String,
    },
}

/// How to run a provider CLI: binary, extra arguments and working directory.
///
/// The final command line is `binary [args..] <autonomous args> <prompt>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCommand {
    provider: Provider,
    binary: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ProviderCommand {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            binary: provider.capabilities().binary.to_string(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Whether the binary can be found on `PATH` (or at the given path).
    pub fn is_available(&self) -> bool {
        which::which(&self.binary).is_ok()
    }

    fn command(&self, prompt: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.args)
            .args(self.provider.autonomous_args(prompt))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        // Linux: request kernel to send SIGTERM to child when parent dies.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        cmd
    }

    /// Run the CLI with `prompt` to completion and return its stdout.
    ///
    /// Dropping the returned future kills the child.
    pub async fn run(&self, prompt: &str) -> Result<String, CliError> {
        debug!("Running {} ({} byte prompt)", self.binary, prompt.len());
        let output = self
            .command(prompt)
            .output()
            .await
            .map_err(|e| CliError::Spawn {
                binary: self.binary.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CliError::Exit {
                binary: self.binary.clone(),
                status: output.status.to_string(),
                stderr: excerpt(&String::from_utf8_lossy(&output.stderr), STDERR_EXCERPT),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A `sh -c` script standing in for the provider binary; the provider's
    /// own arguments arrive as `$@`.
    pub(crate) fn script(body: &str) -> ProviderCommand {
        ProviderCommand::new(Provider::Claude)
            .with_binary("sh")
            .with_args(vec!["-c".into(), body.into(), "sh".into()])
    }

    #[test]
    fn test_defaults_to_provider_binary() {
        let cmd = ProviderCommand::new(Provider::Codex);
        assert_eq!(cmd.binary(), "codex");
        assert_eq!(cmd.provider(), Provider::Codex);
    }

    #[tokio::test]
    async fn test_prompt_is_last_argument() {
        let out = script(r#"for last; do :; done; printf '%s' "$last""#)
            .run("do the thing")
            .await
            .unwrap();
        assert_eq!(out, "do the thing");
    }

    #[tokio::test]
    async fn test_autonomous_flags_are_passed() {
        let out = script(r#"printf '%s ' "$@""#).run("p").await.unwrap();
        assert_eq!(out.trim_end(), "--dangerously-skip-permissions -p p");
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr() {
        let err = script("echo boom >&2; exit 3").run("p").await.unwrap_err();
        match err {
            CliError::Exit { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let cmd = ProviderCommand::new(Provider::Gemini).with_binary("/nonexistent/autopilot-gemini");
        assert!(!cmd.is_available());
        assert!(matches!(
            cmd.run("p").await,
            Err(CliError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn test_working_dir_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let out = script("pwd")
            .with_working_dir(dir.path())
            .run("p")
            .await
            .unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(
            std::path::Path::new(out.trim()).canonicalize().unwrap(),
            expected
        );
    }
}
