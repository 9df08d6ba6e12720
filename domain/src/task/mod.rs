//! Task queue domain
//!
//! - [`entities::Task`]: a unit of work and its lifecycle state machine
//! - [`queue::TaskQueue`]: the ordered collection that owns every task

pub mod entities;
pub mod queue;

pub use entities::{Task, TaskState};
pub use queue::{QueueStats, TaskQueue};
