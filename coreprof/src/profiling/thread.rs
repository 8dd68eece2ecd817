//! Per-thread state owned by the loaded trace

use serde::Serialize;

use coreprof_common::ThreadId;

use crate::config::AnalysisConfig;
use crate::history::{AllocationEvent, CpuHistory};
use crate::stacks::{CallTree, ResolvedSample, ThreadStack};

/// Everything recorded for one managed thread
#[derive(Debug)]
pub struct ThreadData {
    pub id: ThreadId,
    pub runtime_id: Option<u64>,
    pub os_thread_id: Option<u32>,
    /// Set by `thr dst`; the thread's data is kept for statistics
    pub destroyed: bool,
    pub stack: ThreadStack,
    pub samples: Vec<ResolvedSample>,
    pub allocations: Vec<AllocationEvent>,
    pub cpu: CpuHistory,
}

impl ThreadData {
    #[must_use]
    pub fn new(id: ThreadId, config: &AnalysisConfig) -> Self {
        Self {
            id,
            runtime_id: None,
            os_thread_id: None,
            destroyed: false,
            stack: ThreadStack::new(id),
            samples: Vec::new(),
            allocations: Vec::new(),
            cpu: CpuHistory::new(config.core_count, config.cpu_overflow_threshold),
        }
    }

    #[must_use]
    pub fn tree(&self) -> &CallTree {
        self.stack.tree()
    }

    #[must_use]
    pub fn info(&self) -> ThreadInfo {
        ThreadInfo {
            id: self.id,
            runtime_id: self.runtime_id,
            os_thread_id: self.os_thread_id,
            destroyed: self.destroyed,
            samples: self.samples.len(),
            allocations: self.allocations.len(),
            call_tree_nodes: self.tree().len().saturating_sub(1),
        }
    }
}

/// Summary of a thread for listings and reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadInfo {
    pub id: ThreadId,
    pub runtime_id: Option<u64>,
    pub os_thread_id: Option<u32>,
    pub destroyed: bool,
    pub samples: usize,
    pub allocations: usize,
    pub call_tree_nodes: usize,
}
