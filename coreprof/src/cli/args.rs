//! CLI argument definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::AnalysisConfig;
use crate::domain::{Metric, ThreadId, ThreadSelector, TimeFrame};

#[derive(Parser)]
#[command(
    name = "coreprof",
    about = "Analyze Core Profiler traces: hot methods, hot lines and call trees",
    after_help = "\
EXAMPLES:
    coreprof app.log                                 Top methods over the whole trace
    coreprof app.log --start 1000 --end 5000 --tree  Window in ms, with call trees
    coreprof app.log --thread 0x1f --metric time-excl
    coreprof app.log --export report.json --quiet   Write a JSON report"
)]
pub struct Args {
    /// Trace file produced by the Core Profiler
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// Window start in milliseconds
    #[arg(long, value_name = "MS")]
    pub start: Option<u64>,

    /// Window end in milliseconds (inclusive; default: end of trace)
    #[arg(long, value_name = "MS")]
    pub end: Option<u64>,

    /// Restrict tables to one thread (internal id, hex)
    #[arg(long, value_name = "HEX", value_parser = parse_thread_id)]
    pub thread: Option<ThreadId>,

    /// Metric used to rank tables and sort call trees
    #[arg(long, value_enum, default_value_t = MetricArg::SamplesIncl)]
    pub metric: MetricArg,

    /// Rows per table
    #[arg(long, default_value = "20")]
    pub top: usize,

    /// Print the call tree of every selected thread
    #[arg(long)]
    pub tree: bool,

    /// Print CPU utilization series
    #[arg(long)]
    pub cpu: bool,

    /// Export a JSON report to file
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Number of cores used to normalize CPU utilization
    #[arg(long, default_value = "1")]
    pub cores: u32,

    /// Wall time represented by one stack-sample tick
    #[arg(long, value_name = "MS", default_value = "10")]
    pub sampling_interval: u64,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    #[must_use]
    pub fn window(&self) -> TimeFrame {
        TimeFrame::new(self.start.unwrap_or(0), self.end.unwrap_or(u64::MAX))
    }

    #[must_use]
    pub fn selector(&self) -> ThreadSelector {
        ThreadSelector::from(self.thread)
    }

    #[must_use]
    pub fn config(&self) -> AnalysisConfig {
        AnalysisConfig {
            core_count: self.cores,
            sampling_interval_ms: self.sampling_interval,
            ..AnalysisConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    SamplesIncl,
    SamplesExcl,
    TimeIncl,
    TimeExcl,
    MemoryIncl,
    MemoryExcl,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::SamplesIncl => Metric::SamplesInclusive,
            MetricArg::SamplesExcl => Metric::SamplesExclusive,
            MetricArg::TimeIncl => Metric::TimeInclusive,
            MetricArg::TimeExcl => Metric::TimeExclusive,
            MetricArg::MemoryIncl => Metric::MemoryInclusive,
            MetricArg::MemoryExcl => Metric::MemoryExclusive,
        }
    }
}

/// Parse a thread id written as hex, with or without `0x`
fn parse_thread_id(value: &str) -> Result<ThreadId, String> {
    let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")).unwrap_or(value);
    u64::from_str_radix(digits, 16)
        .map(ThreadId)
        .map_err(|e| format!("invalid thread id '{value}': {e}"))
}
