//! Progress side channel.
//!
//! Reports are fire-and-forget: the engine never waits on a reporter, and
//! callers should expect reports to be coalesced or skipped.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse phase of a compression request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Decode,
    Compress,
    Output,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Decode => "decode",
            Phase::Compress => "compress",
            Phase::Output => "output",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of progress reports (`percent` is 0-100).
pub trait Progress {
    fn report(&mut self, phase: Phase, percent: u8);
}

impl<F: FnMut(Phase, u8)> Progress for F {
    fn report(&mut self, phase: Phase, percent: u8) {
        self(phase, percent.min(100))
    }
}

/// A reporter that drops every report.
pub fn no_progress() -> impl FnMut(Phase, u8) {
    |_, _| {}
}
