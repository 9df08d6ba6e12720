//! Workspace fingerprinting via git

use async_trait::async_trait;
use autopilot_application::WorkspaceProbe;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

/// Hashes `HEAD` together with `git status --porcelain`, so both new
/// commits and uncommitted edits change the fingerprint.
pub struct GitWorkspaceProbe {
    root: PathBuf,
}

impl GitWorkspaceProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn git(&self, args: &[&str]) -> Option<Vec<u8>> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .await;
        match output {
            Ok(output) if output.status.success() => Some(output.stdout),
            Ok(output) => {
                debug!(
                    "git {} failed: {}",
                    args.join(" "),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                None
            }
            Err(e) => {
                warn!("Failed to execute git: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl WorkspaceProbe for GitWorkspaceProbe {
    async fn fingerprint(&self) -> Option<String> {
        // An unborn HEAD (no commits yet) still has a meaningful status
        let head = self
            .git(&["rev-parse", "HEAD"])
            .await
            .unwrap_or_default();
        let status = self.git(&["status", "--porcelain"]).await?;

        let mut hasher = Sha256::new();
        hasher.update(&head);
        hasher.update(b"\0");
        hasher.update(&status);
        Some(format!("{:x}", hasher.finalize()))
    }
}
