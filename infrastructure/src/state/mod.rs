//! File-backed run state
//!
//! Everything a run persists lives under one state directory (default
//! `.autopilot/`):
//!
//! ```text
//! .autopilot/
//! ├── session.json
//! ├── events.jsonl
//! ├── PAUSE | STOP                 control signal files
//! ├── runner.pid                   PID of the live `autopilot run`
//! ├── logs/autopilot.log.YYYY-MM-DD
//! ├── queue/
//! │   ├── pending.json             queued tasks in dispatch order
//! │   ├── tasks.json               full queue snapshot
//! │   ├── current-task.json        tasks bound to agents
//! │   └── dead-letter.jsonl
//! └── council/
//!     ├── state.json
//!     ├── votes/round-NNNN.json
//!     ├── convergence.log
//!     └── report.md
//! ```

mod control;
mod file_store;
mod io;
mod runner;

pub use control::FileControlChannel;
pub use file_store::{FileStateStore, StateLayout};
pub use runner::{PidRunnerLiveness, RunnerLock};
