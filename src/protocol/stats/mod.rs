//! Echo-test counters and the end-of-run summary.
use core::fmt;

use crate::protocol::harness::CycleOutcome;

/// Counters mutated once per completed cycle.
///
/// `ok` is derived, so `total == ok + errors + missed` holds by construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    /// Completed cycles.
    pub total: u32,
    /// Echoes that carried a different value.
    pub errors: u32,
    /// Cycles without an echo inside the window.
    pub missed: u32,
}

impl Stats {
    pub const fn new() -> Self {
        Self {
            total: 0,
            errors: 0,
            missed: 0,
        }
    }

    /// Account for one completed cycle.
    pub fn record(&mut self, outcome: &CycleOutcome) {
        self.total += 1;
        match outcome {
            CycleOutcome::Matched { .. } => {}
            CycleOutcome::Mismatched { .. } => self.errors += 1,
            CycleOutcome::TimedOut { .. } => self.missed += 1,
        }
    }

    /// Cycles whose echo carried the value that was sent.
    pub fn ok(&self) -> u32 {
        self.total
            .saturating_sub(self.errors)
            .saturating_sub(self.missed)
    }

    pub fn summary(&self) -> Summary {
        Summary::from(self)
    }
}

//==================================================================================SUMMARY
/// Read-only rendering of the final counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Summary {
    pub total: u32,
    pub ok: u32,
    pub errors: u32,
    pub missed: u32,
}

impl From<&Stats> for Summary {
    fn from(stats: &Stats) -> Self {
        Self {
            total: stats.total,
            ok: stats.ok(),
            errors: stats.errors,
            missed: stats.missed,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Test Summary ---")?;
        writeln!(f, "Total messages sent         : {}", self.total)?;
        writeln!(f, "Successful transmissions    : {}", self.ok)?;
        writeln!(f, "Transmission errors         : {}", self.errors)?;
        writeln!(f, "Messages lost (no reply)    : {}", self.missed)?;
        write!(f, "---------------------")
    }
}
