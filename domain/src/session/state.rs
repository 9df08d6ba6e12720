//! Session lifecycle states

use serde::{Deserialize, Serialize};

/// State of the run's single session
///
/// ```text
/// idle → initializing → running → phase_0 → … → phase_n → completing → completed
///                          │           │
///                          ├── paused ─┤        (pause / resume)
///                          ├──────────►├── failed
///                          │           └── max_retries_exceeded
///        any non-terminal ──────────────── stopped
///
/// terminal ──reset──► idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Initializing,
    Running,
    Paused,
    /// Working through the SDLC phase with this index
    Phase(usize),
    Completing,
    Completed,
    Failed,
    MaxRetriesExceeded,
    Stopped,
}

impl SessionState {
    /// States in which iterations advance
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Running | SessionState::Phase(_) | SessionState::Completing
        )
    }

    /// States only left through an explicit reset
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed
                | SessionState::Failed
                | SessionState::MaxRetriesExceeded
                | SessionState::Stopped
        )
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, SessionState::Paused)
    }

    pub fn label(&self) -> String {
        match self {
            SessionState::Idle => "idle".into(),
            SessionState::Initializing => "initializing".into(),
            SessionState::Running => "running".into(),
            SessionState::Paused => "paused".into(),
            SessionState::Phase(n) => format!("phase_{n}"),
            SessionState::Completing => "completing".into(),
            SessionState::Completed => "completed".into(),
            SessionState::Failed => "failed".into(),
            SessionState::MaxRetriesExceeded => "max_retries_exceeded".into(),
            SessionState::Stopped => "stopped".into(),
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(SessionState::Phase(2).to_string(), "phase_2");
        assert_eq!(
            SessionState::MaxRetriesExceeded.to_string(),
            "max_retries_exceeded"
        );
    }

    #[test]
    fn test_classification() {
        assert!(SessionState::Phase(0).is_active());
        assert!(!SessionState::Paused.is_active());
        assert!(SessionState::Stopped.is_terminal());
        assert!(!SessionState::Completing.is_terminal());
    }

    #[test]
    fn test_phase_state_roundtrips_through_json() {
        let json = serde_json::to_string(&SessionState::Phase(3)).unwrap();
        assert_eq!(json, r#"{"phase":3}"#);
        let back: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SessionState::Phase(3));
    }
}
