//! Analysis configuration
//!
//! All knobs that change how a trace is interpreted. The CLI maps its flags
//! onto this struct; library users construct it directly.

use serde::{Deserialize, Serialize};

/// CPU-time delta (µs) treated as counter wraparound by default
pub const DEFAULT_CPU_OVERFLOW_THRESHOLD: u64 = 0xFFFF_FFFF;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Divisor of the CPU utilization formula
    pub core_count: u32,
    /// Wall-time weight of one stack-sample tick
    pub sampling_interval_ms: u64,
    /// CPU-time delta at or above which a CPU record is discarded
    pub cpu_overflow_threshold: u64,
    /// Keep every raw input line in the loaded model
    pub keep_raw_lines: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            core_count: 1,
            sampling_interval_ms: 10,
            cpu_overflow_threshold: DEFAULT_CPU_OVERFLOW_THRESHOLD,
            keep_raw_lines: false,
        }
    }
}

impl AnalysisConfig {
    /// Wall time represented by `count` sampling ticks
    #[must_use]
    pub fn sample_time(&self, count: u64) -> u64 {
        count.saturating_mul(self.sampling_interval_ms)
    }
}
