//! Workspace fingerprint port
//!
//! The convergence log records one fingerprint per iteration. Equal
//! fingerprints mean the agents did not change the workspace.

use async_trait::async_trait;

#[async_trait]
pub trait WorkspaceProbe: Send + Sync {
    /// Fingerprint of the current workspace, or `None` when it cannot be
    /// computed (e.g. not a git checkout). Failures are logged by the adapter.
    async fn fingerprint(&self) -> Option<String>;
}

/// Probe that never produces a fingerprint; disables stagnation detection
pub struct NoWorkspaceProbe;

#[async_trait]
impl WorkspaceProbe for NoWorkspaceProbe {
    async fn fingerprint(&self) -> Option<String> {
        None
    }
}
