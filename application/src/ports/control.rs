//! Out-of-process control ports
//!
//! A running session polls a [`ControlSource`] for pause/resume/stop
//! requests; CLI commands issued from another process deliver them through a
//! [`ControlSink`]. A [`RunnerLiveness`] tells whether any process is still
//! there to receive them.

use crate::ports::state_store::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlSignal {
    Pause,
    Resume,
    Stop,
}

impl ControlSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlSignal::Pause => "pause",
            ControlSignal::Resume => "resume",
            ControlSignal::Stop => "stop",
        }
    }
}

impl std::fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait ControlSource: Send + Sync {
    /// Next pending signal, if any. Each request is reported once.
    async fn poll(&self) -> Option<ControlSignal>;
}

#[async_trait]
pub trait ControlSink: Send + Sync {
    async fn send(&self, signal: ControlSignal) -> Result<(), StoreError>;

    /// Drop any pending signals (used on reset).
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Control source that never signals, for in-process-only runs and tests
pub struct NoControl;

#[async_trait]
impl ControlSource for NoControl {
    async fn poll(&self) -> Option<ControlSignal> {
        None
    }
}

/// Whether a live runner process owns the recorded session
#[async_trait]
pub trait RunnerLiveness: Send + Sync {
    async fn runner_alive(&self) -> bool;
}

/// Used on platforms or in tests where liveness is unknown; always reports a
/// live runner.
pub struct AssumeRunnerAlive;

#[async_trait]
impl RunnerLiveness for AssumeRunnerAlive {
    async fn runner_alive(&self) -> bool {
        true
    }
}
