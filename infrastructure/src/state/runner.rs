//! Runner ownership of the state directory
//!
//! `autopilot run` writes its PID to `runner.pid` for as long as it runs.
//! Other commands read it to tell a live session from one whose process
//! died without recording a terminal state.

use super::file_store::StateLayout;
use super::io::{atomic_write, remove_if_exists};
use async_trait::async_trait;
use autopilot_application::{RunnerLiveness, StoreError};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Held by the running process; removes the PID file on drop.
pub struct RunnerLock {
    path: PathBuf,
    pid: u32,
}

impl RunnerLock {
    pub fn acquire(layout: &StateLayout) -> Result<Self, StoreError> {
        let path = layout.runner_pid();
        let pid = std::process::id();
        atomic_write(&path, format!("{pid}\n").as_bytes())?;
        debug!("Runner {} owns {}", pid, layout.root().display());
        Ok(Self { path, pid })
    }
}

impl Drop for RunnerLock {
    fn drop(&mut self) {
        // A later runner may have taken over the file
        if read_pid(&self.path) == Some(self.pid)
            && let Err(e) = remove_if_exists(&self.path)
        {
            warn!("Failed to release runner lock: {}", e);
        }
    }
}

fn read_pid(path: &std::path::Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Checks the recorded runner PID against the live process table.
pub struct PidRunnerLiveness {
    layout: StateLayout,
}

impl PidRunnerLiveness {
    pub fn new(layout: StateLayout) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl RunnerLiveness for PidRunnerLiveness {
    async fn runner_alive(&self) -> bool {
        match read_pid(&self.layout.runner_pid()) {
            Some(pid) => process_alive(pid),
            None => false,
        }
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // Signal 0 checks existence and permission without delivering anything
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lock_marks_runner_alive_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StateLayout::new(dir.path());
        let liveness = PidRunnerLiveness::new(layout.clone());
        assert!(!liveness.runner_alive().await);

        let lock = RunnerLock::acquire(&layout).unwrap();
        assert!(liveness.runner_alive().await);
        assert_eq!(read_pid(&layout.runner_pid()), Some(std::process::id()));

        drop(lock);
        assert!(!layout.runner_pid().exists());
        assert!(!liveness.runner_alive().await);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_stale_pid_is_not_alive() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StateLayout::new(dir.path());
        // Above the kernel's pid_max ceiling, so no such process exists
        std::fs::write(layout.runner_pid(), "4194305\n").unwrap();
        assert!(!PidRunnerLiveness::new(layout).runner_alive().await);
    }

    #[tokio::test]
    async fn test_garbage_pid_file_is_not_alive() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StateLayout::new(dir.path());
        std::fs::write(layout.runner_pid(), "not a pid").unwrap();
        assert!(!PidRunnerLiveness::new(layout).runner_alive().await);
    }
}
