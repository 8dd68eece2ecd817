//! The loaded trace
//!
//! A [`TraceModel`] is produced once by the loader and never mutated
//! afterwards. Every query works on shared references, so one model can
//! serve concurrent aggregations.

use std::collections::BTreeMap;

use coreprof_common::ThreadId;

use super::diagnostics::LoadDiagnostics;
use super::thread::{ThreadData, ThreadInfo};
use crate::config::AnalysisConfig;
use crate::domain::TimeScale;
use crate::history::{AllocationHistory, CpuHistory, GcHistory};
use crate::metadata::MetadataRegistry;

#[derive(Debug)]
pub struct TraceModel {
    pub config: AnalysisConfig,
    pub registry: MetadataRegistry,
    pub threads: BTreeMap<ThreadId, ThreadData>,
    pub process_cpu: CpuHistory,
    pub allocations: AllocationHistory,
    pub gc: GcHistory,
    pub time_scale: TimeScale,
    pub diagnostics: LoadDiagnostics,
    /// Raw input lines, kept only when the config asks for them
    pub raw_lines: Option<Vec<String>>,
}

impl TraceModel {
    #[must_use]
    pub fn thread(&self, id: ThreadId) -> Option<&ThreadData> {
        self.threads.get(&id)
    }

    #[must_use]
    pub fn thread_infos(&self) -> Vec<ThreadInfo> {
        self.threads.values().map(ThreadData::info).collect()
    }

    /// Timestamp of the last stack sample, in milliseconds
    #[must_use]
    pub fn last_sample_time(&self) -> Option<u64> {
        self.threads.values().flat_map(|t| t.samples.iter().map(|s| s.timestamp)).max()
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.threads.values().map(|t| t.samples.len()).sum()
    }
}
