//! Point-in-time view of a run, answered by the `status` query and
//! persisted as the session snapshot.

use super::entities::Session;
use super::state::SessionState;
use crate::council::RoundOutcome;
use crate::providers::Provider;
use crate::task::QueueStats;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session: Session,
    pub phase_name: Option<String>,
    pub active_agents: usize,
    pub queue: QueueStats,
    pub provider: Provider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_council_outcome: Option<RoundOutcome>,
}

impl SessionStatus {
    pub fn new(session: Session, provider: Provider) -> Self {
        Self {
            session,
            phase_name: None,
            active_agents: 0,
            queue: QueueStats::default(),
            provider,
            last_council_outcome: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn iteration(&self) -> u64 {
        self.session.iteration()
    }

    /// "2/4 (testing)" style progress label
    pub fn phase_label(&self) -> String {
        let count = self.session.phase_count();
        if count == 0 {
            return "-".to_string();
        }
        let position = format!("{}/{}", self.session.phase_index() + 1, count);
        match &self.phase_name {
            Some(name) => format!("{} ({})", position, name),
            None => position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::SessionId;
    use chrono::Utc;

    #[test]
    fn test_status_roundtrips_through_json() {
        let mut session = Session::new(SessionId::new("s1"), Utc::now());
        session.initialize(3, Utc::now()).unwrap();
        session.start(Utc::now()).unwrap();
        session.advance_phase(true, Utc::now()).unwrap();

        let mut status = SessionStatus::new(session, Provider::Claude);
        status.phase_name = Some("requirements".into());
        status.active_agents = 2;

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["session"]["state"], serde_json::json!({ "phase": 0 }));
        assert_eq!(json["session"]["id"], "s1");
        assert_eq!(json["provider"], "claude");
        assert_eq!(status.phase_label(), "1/3 (requirements)");

        let back: SessionStatus = serde_json::from_value(json).unwrap();
        assert_eq!(back, status);
    }
}
