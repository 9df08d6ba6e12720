//! Council member ports
//!
//! A council member answers a vote prompt with free-form text; the council
//! use case parses the decision out of it. The devil's advocate is a separate
//! port because it is asked a different question and may be a different
//! adapter.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while asking a council member
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemberError {
    #[error("Member unavailable: {0}")]
    Unavailable(String),

    #[error("Member failed: {0}")]
    Failed(String),

    #[error("Timeout")]
    Timeout,
}

#[async_trait]
pub trait CouncilMember: Send + Sync {
    /// Stable name used in vote records (e.g. "claude-1")
    fn name(&self) -> &str;

    /// Ask for a vote; returns the raw answer.
    async fn vote(&self, prompt: &str) -> Result<String, MemberError>;
}

#[async_trait]
pub trait DevilsAdvocate: Send + Sync {
    fn name(&self) -> &str;

    /// Ask for a review of a unanimous round; returns the raw answer.
    async fn review(&self, prompt: &str) -> Result<String, MemberError>;
}
