//! Load diagnostics
//!
//! Counters for everything the loader absorbed instead of failing: lines it
//! could not parse, samples it could not apply, allocations with no stack to
//! attribute them to. A report built from a trace with non-zero counters is
//! still valid, but incomplete, and the CLI says so.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadDiagnostics {
    /// Raw lines read, blank lines included
    pub lines_read: usize,
    /// Lines that produced a typed record
    pub records_parsed: usize,
    pub unrecognized_lines: usize,
    /// Stack samples that did not fit the thread's current stack
    pub dropped_samples: usize,
    /// Stack samples that resolved to an empty stack
    pub empty_stack_samples: usize,
    /// Allocation entries recorded while their thread's stack was empty
    pub unattributed_allocations: usize,
}

impl LoadDiagnostics {
    /// Returns true if every line parsed and every sample was applied
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unrecognized_lines == 0 && self.dropped_samples == 0
    }
}

impl fmt::Display for LoadDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lines={} records={} unrecognized={} dropped_samples={} empty_stacks={} unattributed_allocations={}",
            self.lines_read,
            self.records_parsed,
            self.unrecognized_lines,
            self.dropped_samples,
            self.empty_stack_samples,
            self.unattributed_allocations,
        )
    }
}
