//! Convergence tracking and council scheduling
//!
//! Every iteration the session records a fingerprint of the workspace. A run
//! whose fingerprint stops changing is stagnating; the council is then asked
//! to vote even between its regular check intervals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of the append-only convergence log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceEntry {
    pub iteration: u64,
    pub hash: String,
    pub recorded_at: DateTime<Utc>,
}

/// Result of recording a fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceSignal {
    /// The workspace changed since the previous iteration
    Progressing,
    /// Unchanged for `repeats` consecutive iterations
    Unchanged { repeats: u32 },
    /// Unchanged for at least the stagnation limit
    Stagnant { repeats: u32 },
}

impl ConvergenceSignal {
    pub fn is_stagnant(&self) -> bool {
        matches!(self, ConvergenceSignal::Stagnant { .. })
    }
}

/// Tracks consecutive identical fingerprints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceTracker {
    stagnation_limit: u32,
    last_hash: Option<String>,
    repeats: u32,
}

impl ConvergenceTracker {
    /// `stagnation_limit = 0` disables stagnation detection.
    pub fn new(stagnation_limit: u32) -> Self {
        Self {
            stagnation_limit,
            last_hash: None,
            repeats: 0,
        }
    }

    pub fn record(&mut self, hash: &str) -> ConvergenceSignal {
        if self.last_hash.as_deref() == Some(hash) {
            self.repeats += 1;
        } else {
            self.last_hash = Some(hash.to_string());
            self.repeats = 0;
            return ConvergenceSignal::Progressing;
        }

        if self.stagnation_limit > 0 && self.repeats >= self.stagnation_limit {
            ConvergenceSignal::Stagnant {
                repeats: self.repeats,
            }
        } else {
            ConvergenceSignal::Unchanged {
                repeats: self.repeats,
            }
        }
    }

    pub fn repeats(&self) -> u32 {
        self.repeats
    }
}

/// When the council votes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouncilSchedule {
    /// Vote every `interval` iterations (0 disables periodic votes)
    pub interval: u64,
    /// Never vote before this iteration
    pub min_iterations: u64,
}

impl Default for CouncilSchedule {
    fn default() -> Self {
        Self {
            interval: 5,
            min_iterations: 3,
        }
    }
}

impl CouncilSchedule {
    pub fn is_due(&self, iteration: u64, stagnant: bool) -> bool {
        if iteration == 0 || iteration < self.min_iterations {
            return false;
        }
        stagnant || (self.interval > 0 && iteration % self.interval == 0)
    }
}
