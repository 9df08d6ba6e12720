//! Provider CLI adapters
//!
//! Every interaction with an AI provider goes through its command-line tool
//! in non-interactive mode: task attempts, council votes and the
//! devil's-advocate review alike.

mod command;
mod council;
mod executor;

pub use command::{CliError, ProviderCommand};
pub use council::{CliCouncilMember, CliDevilsAdvocate, council_members};
pub use executor::CliTaskExecutor;
