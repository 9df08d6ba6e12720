//! Session domain
//!
//! - [`entities::Session`]: the run's top-level state machine
//! - [`backlog::Backlog`]: the phased task list a run is seeded from
//! - [`status::SessionStatus`]: snapshot answered by the status query

pub mod backlog;
pub mod context;
pub mod entities;
pub mod state;
pub mod status;

pub use backlog::{Backlog, BacklogError, PhaseSpec, TaskSpec};
pub use context::SessionContext;
pub use entities::Session;
pub use state::SessionState;
pub use status::SessionStatus;
