use crate::core::ids::SessionId;
use chrono::{DateTime, Utc};

/// Identity of the running session, passed explicitly to every component
/// that records or persists on its behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(session_id: SessionId, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            started_at,
        }
    }

    /// Fresh context with a generated session id
    pub fn generate(now: DateTime<Utc>) -> Self {
        Self::new(SessionId::generate(), now)
    }
}
