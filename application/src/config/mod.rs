//! Application-level configuration.
//!
//! This module provides configuration types that control how use cases behave:
//!
//! - [`ExecutionParams`]: worker and scheduler loop control (timeouts, limits)
//! - [`CouncilParams`]: completion council size, schedule and rule
//! - [`RunConfig`]: container handed to the session runner

pub mod council_params;
pub mod execution_params;
pub mod run_config;

pub use council_params::CouncilParams;
pub use execution_params::ExecutionParams;
pub use run_config::RunConfig;
