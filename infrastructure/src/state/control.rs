//! Signal files for controlling a run from another process
//!
//! `autopilot pause` creates `PAUSE`, `autopilot resume` removes it and
//! `autopilot stop` creates `STOP`. The running session polls for them.

use super::file_store::StateLayout;
use super::io::{atomic_write, remove_if_exists};
use async_trait::async_trait;
use autopilot_application::{ControlSignal, ControlSink, ControlSource, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

pub struct FileControlChannel {
    layout: StateLayout,
    /// Whether the last poll saw the PAUSE file
    paused: AtomicBool,
}

impl FileControlChannel {
    pub fn new(layout: StateLayout) -> Self {
        Self {
            layout,
            paused: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ControlSource for FileControlChannel {
    async fn poll(&self) -> Option<ControlSignal> {
        let stop = self.layout.stop_file();
        if stop.exists() {
            if let Err(e) = remove_if_exists(&stop) {
                warn!("Failed to consume stop signal: {}", e);
            }
            info!("Stop signal file detected");
            return Some(ControlSignal::Stop);
        }

        let pause_requested = self.layout.pause_file().exists();
        let was_paused = self.paused.swap(pause_requested, Ordering::SeqCst);
        match (was_paused, pause_requested) {
            (false, true) => Some(ControlSignal::Pause),
            (true, false) => Some(ControlSignal::Resume),
            _ => None,
        }
    }
}

#[async_trait]
impl ControlSink for FileControlChannel {
    async fn send(&self, signal: ControlSignal) -> Result<(), StoreError> {
        let stamp = chrono::Utc::now().to_rfc3339();
        match signal {
            ControlSignal::Pause => atomic_write(&self.layout.pause_file(), stamp.as_bytes()),
            ControlSignal::Resume => remove_if_exists(&self.layout.pause_file()),
            ControlSignal::Stop => atomic_write(&self.layout.stop_file(), stamp.as_bytes()),
        }
    }

    async fn clear(&self) -> Result<(), StoreError> {
        remove_if_exists(&self.layout.pause_file())?;
        remove_if_exists(&self.layout.stop_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(dir: &tempfile::TempDir) -> (FileControlChannel, FileControlChannel) {
        let layout = StateLayout::new(dir.path());
        (
            FileControlChannel::new(layout.clone()),
            FileControlChannel::new(layout),
        )
    }

    #[tokio::test]
    async fn test_no_files_no_signal() {
        let dir = tempfile::tempdir().unwrap();
        let (runner, _) = channels(&dir);
        assert_eq!(runner.poll().await, None);
    }

    #[tokio::test]
    async fn test_pause_then_resume_reported_once_each() {
        let dir = tempfile::tempdir().unwrap();
        let (runner, cli) = channels(&dir);

        cli.send(ControlSignal::Pause).await.unwrap();
        assert_eq!(runner.poll().await, Some(ControlSignal::Pause));
        assert_eq!(runner.poll().await, None);

        cli.send(ControlSignal::Resume).await.unwrap();
        assert_eq!(runner.poll().await, Some(ControlSignal::Resume));
        assert_eq!(runner.poll().await, None);
    }

    #[tokio::test]
    async fn test_stop_is_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let (runner, cli) = channels(&dir);

        cli.send(ControlSignal::Stop).await.unwrap();
        assert_eq!(runner.poll().await, Some(ControlSignal::Stop));
        assert!(!dir.path().join("STOP").exists());
        assert_eq!(runner.poll().await, None);
    }

    #[tokio::test]
    async fn test_clear_removes_pending_signals() {
        let dir = tempfile::tempdir().unwrap();
        let (runner, cli) = channels(&dir);

        cli.send(ControlSignal::Pause).await.unwrap();
        cli.send(ControlSignal::Stop).await.unwrap();
        cli.clear().await.unwrap();
        assert_eq!(runner.poll().await, None);
    }
}
