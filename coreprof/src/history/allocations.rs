//! Allocation history
//!
//! Allocation events are kept twice: per thread with their stack attribution
//! (for memory statistics) and per class as a plain time series (for memory
//! views). Both are append-only.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use coreprof_common::{ClassId, SourceLineId, ThreadId};

use crate::domain::TimeFrame;
use crate::stacks::NodeIndex;

/// One allocation entry attributed to the stack of its thread
#[derive(Debug, Clone)]
pub struct AllocationEvent {
    /// Milliseconds since the profiler time reference
    pub timestamp: u64,
    pub class_id: ClassId,
    pub count: u64,
    pub size: u64,
    /// Top of stack when the allocation happened; the root for an empty stack
    pub node: NodeIndex,
    /// Line resolved from the entry's IP within the top function
    pub line: Option<SourceLineId>,
    /// Distinct lines on the stack at allocation time
    pub stack_lines: Arc<[SourceLineId]>,
}

impl AllocationEvent {
    #[must_use]
    pub fn is_attributed(&self) -> bool {
        self.node != NodeIndex::ROOT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassAllocationPoint {
    pub timestamp: u64,
    pub thread_id: ThreadId,
    pub count: u64,
    pub size: u64,
}

/// Process-wide allocation series keyed by class
#[derive(Debug, Clone, Default)]
pub struct AllocationHistory {
    by_class: BTreeMap<ClassId, Vec<ClassAllocationPoint>>,
}

impl AllocationHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, thread_id: ThreadId, event: &AllocationEvent) {
        self.by_class.entry(event.class_id).or_default().push(ClassAllocationPoint {
            timestamp: event.timestamp,
            thread_id,
            count: event.count,
            size: event.size,
        });
    }

    pub fn classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.by_class.keys().copied()
    }

    #[must_use]
    pub fn series(&self, class_id: ClassId) -> &[ClassAllocationPoint] {
        self.by_class.get(&class_id).map_or(&[], Vec::as_slice)
    }

    /// Total (count, size) allocated for `class_id` inside `window`
    #[must_use]
    pub fn totals(&self, class_id: ClassId, window: TimeFrame) -> (u64, u64) {
        self.series(class_id)
            .iter()
            .filter(|p| window.contains(p.timestamp))
            .fold((0, 0), |(count, size), p| {
                (count.saturating_add(p.count), size.saturating_add(p.size))
            })
    }
}
