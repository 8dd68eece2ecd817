//! Domain types providing compile-time safety and self-documentation
//!
//! Time in the analyzer is always milliseconds relative to the profiler's
//! time reference. Raw record timestamps are profiler ticks and go through
//! [`TimeScale`] exactly once, at ingestion.

// Percentages intentionally convert u64 to f64
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;
use std::fmt;

use coreprof_common::ThreadId;

/// Selected time window in milliseconds, inclusive on both ends
///
/// `end == u64::MAX` means "until the end of the trace".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeFrame {
    pub start: u64,
    pub end: u64,
}

impl TimeFrame {
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// The whole trace
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { start: 0, end: u64::MAX }
    }

    /// Window starting at `start` with no upper bound
    #[must_use]
    pub const fn starting_at(start: u64) -> Self {
        Self { start, end: u64::MAX }
    }

    /// Returns true if the window cannot contain any timestamp
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start > self.end
    }

    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.end == u64::MAX
    }

    /// Returns true if `timestamp_ms` lies in `[start, end]`
    #[must_use]
    pub const fn contains(&self, timestamp_ms: u64) -> bool {
        timestamp_ms >= self.start && timestamp_ms <= self.end
    }
}

impl Default for TimeFrame {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "[{}ms, end]", self.start)
        } else {
            write!(f, "[{}ms, {}ms]", self.start, self.end)
        }
    }
}

/// Conversion from profiler ticks to milliseconds
///
/// Configured by the `prf tps` (ticks per second) and `prf trs` (reference
/// tick) records. Defaults treat ticks as milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeScale {
    pub ticks_per_second: u64,
    pub reference: u64,
}

impl TimeScale {
    /// Convert a raw tick value to milliseconds since the reference
    #[must_use]
    pub fn to_millis(&self, ticks: u64) -> u64 {
        let ticks = u128::from(ticks.saturating_sub(self.reference));
        let per_second = u128::from(self.ticks_per_second.max(1));
        u64::try_from(ticks * 1000 / per_second).unwrap_or(u64::MAX)
    }
}

impl Default for TimeScale {
    fn default() -> Self {
        Self { ticks_per_second: 1000, reference: 0 }
    }
}

/// Which threads an aggregation covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThreadSelector {
    #[default]
    All,
    Thread(ThreadId),
}

impl ThreadSelector {
    #[must_use]
    pub fn matches(&self, thread: ThreadId) -> bool {
        match self {
            ThreadSelector::All => true,
            ThreadSelector::Thread(id) => *id == thread,
        }
    }
}

impl From<Option<ThreadId>> for ThreadSelector {
    fn from(thread: Option<ThreadId>) -> Self {
        thread.map_or(ThreadSelector::All, ThreadSelector::Thread)
    }
}

/// Statistic used to rank tables and sort call trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Metric {
    #[default]
    SamplesInclusive,
    SamplesExclusive,
    TimeInclusive,
    TimeExclusive,
    MemoryInclusive,
    MemoryExclusive,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::SamplesInclusive,
        Metric::SamplesExclusive,
        Metric::TimeInclusive,
        Metric::TimeExclusive,
        Metric::MemoryInclusive,
        Metric::MemoryExclusive,
    ];

    /// Human readable column label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Metric::SamplesInclusive => "samples (incl)",
            Metric::SamplesExclusive => "samples (excl)",
            Metric::TimeInclusive => "time ms (incl)",
            Metric::TimeExclusive => "time ms (excl)",
            Metric::MemoryInclusive => "memory B (incl)",
            Metric::MemoryExclusive => "memory B (excl)",
        }
    }
}

/// `100 * value / total`, or 0 when there is nothing to divide by
#[must_use]
pub fn percent_of(value: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (value as f64 / total as f64) * 100.0
    }
}
