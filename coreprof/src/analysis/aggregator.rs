//! Windowed statistics aggregation
//!
//! One pass over the resolved samples and allocation events of the selected
//! threads whose timestamp falls inside the window.
//!
//! # Attribution
//!
//! ```text
//! resolved stack   Main → Parse → Parse → Read      (leaf = Read)
//!
//! tree nodes       exclusive: Read
//!                  inclusive: Read, Parse (inner), Parse (outer), Main
//! functions        exclusive: Read
//!                  inclusive: {Main, Parse, Read}   (Parse credited once)
//! lines            exclusive: leaf line
//!                  inclusive: distinct lines on the stack
//! ```
//!
//! Memory follows the same rules with the stack in effect when the
//! allocation happened. Weight with no stack to attribute it to is reported
//! in [`Aggregation::unattributed`] and stays out of the totals, so the sum
//! of the root children's inclusive values always equals the totals.
//!
//! # Concurrency
//!
//! [`aggregate`] only reads the model. Any number of aggregations over
//! different windows may run in parallel on one [`TraceModel`].

use std::collections::{BTreeMap, HashMap, HashSet};

use coreprof_common::{FunctionId, SourceLineId, ThreadId};

use super::cancel::CancellationToken;
use super::statistics::{Statistics, Unattributed};
use crate::domain::{AnalysisError, ThreadSelector, TimeFrame};
use crate::profiling::{ThreadData, TraceModel};
use crate::stacks::{CallTree, NodeIndex};

/// Per-node statistics of one thread's call tree, indexed by [`NodeIndex`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeStatistics {
    nodes: Vec<Statistics>,
}

impl NodeStatistics {
    fn for_tree(tree: &CallTree) -> Self {
        Self { nodes: vec![Statistics::default(); tree.len()] }
    }

    #[must_use]
    pub fn get(&self, node: NodeIndex) -> Statistics {
        self.nodes.get(node.index()).copied().unwrap_or_default()
    }

    /// Returns true if anything inside the window went through `node`
    #[must_use]
    pub fn is_reached(&self, node: NodeIndex) -> bool {
        !self.get(node).is_zero()
    }

    fn node_mut(&mut self, node: NodeIndex) -> &mut Statistics {
        &mut self.nodes[node.index()]
    }
}

/// Result of one aggregation
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub window: TimeFrame,
    /// Grand totals; inclusive and exclusive fields are equal
    pub totals: Statistics,
    pub functions: HashMap<FunctionId, Statistics>,
    pub lines: HashMap<SourceLineId, Statistics>,
    pub call_trees: BTreeMap<ThreadId, NodeStatistics>,
    pub unattributed: Unattributed,
}

impl Aggregation {
    #[must_use]
    pub fn empty(window: TimeFrame) -> Self {
        Self { window, ..Self::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.totals.is_zero() && self.unattributed == Unattributed::default()
    }

    #[must_use]
    pub fn function(&self, id: FunctionId) -> Statistics {
        self.functions.get(&id).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn line(&self, id: SourceLineId) -> Statistics {
        self.lines.get(&id).copied().unwrap_or_default()
    }

    /// Fold another thread's aggregation into this one
    pub fn merge(&mut self, other: Aggregation) {
        self.totals += other.totals;
        self.unattributed += other.unattributed;
        for (id, stats) in other.functions {
            *self.functions.entry(id).or_default() += stats;
        }
        for (id, stats) in other.lines {
            *self.lines.entry(id).or_default() += stats;
        }
        self.call_trees.extend(other.call_trees);
    }
}

/// Aggregate the selected threads over `window`
///
/// An empty or inverted window yields an empty aggregation.
///
/// # Errors
/// Returns [`AnalysisError::Cancelled`] if `token` is cancelled before the
/// pass completes. No partial result is returned.
pub fn aggregate(
    model: &TraceModel,
    selector: ThreadSelector,
    window: TimeFrame,
    token: &CancellationToken,
) -> Result<Aggregation, AnalysisError> {
    let mut result = Aggregation::empty(window);
    if window.is_empty() {
        return Ok(result);
    }

    for thread in model.threads.values().filter(|t| selector.matches(t.id)) {
        result.merge(aggregate_thread(thread, window, token)?);
    }
    Ok(result)
}

/// Aggregate one thread over `window`
///
/// # Errors
/// Returns [`AnalysisError::Cancelled`] if `token` is cancelled.
pub fn aggregate_thread(
    thread: &ThreadData,
    window: TimeFrame,
    token: &CancellationToken,
) -> Result<Aggregation, AnalysisError> {
    let tree = thread.tree();
    let mut pass = ThreadPass {
        tree,
        result: Aggregation::empty(window),
        nodes: NodeStatistics::for_tree(tree),
        seen_functions: HashSet::new(),
    };

    // === STACK SAMPLES ===
    for sample in thread.samples.iter().filter(|s| window.contains(s.timestamp)) {
        token.check()?;
        if sample.is_empty_stack() {
            pass.result.unattributed.samples =
                pass.result.unattributed.samples.saturating_add(sample.count);
            pass.result.unattributed.time = pass.result.unattributed.time.saturating_add(sample.time);
            continue;
        }
        pass.add_sample(sample.top, sample.count, sample.time, sample.leaf_line, &sample.lines);
    }

    // === ALLOCATIONS ===
    for event in thread.allocations.iter().filter(|e| window.contains(e.timestamp)) {
        token.check()?;
        if !event.is_attributed() {
            pass.result.unattributed.memory =
                pass.result.unattributed.memory.saturating_add(event.size);
            continue;
        }
        pass.add_allocation(event.node, event.size, event.line, &event.stack_lines);
    }

    Ok(pass.finish(thread.id))
}

/// Scratch state of one thread's aggregation
struct ThreadPass<'a> {
    tree: &'a CallTree,
    result: Aggregation,
    nodes: NodeStatistics,
    /// Functions already credited for the current sample
    seen_functions: HashSet<FunctionId>,
}

impl ThreadPass<'_> {
    fn add_sample(
        &mut self,
        top: NodeIndex,
        count: u64,
        time: u64,
        leaf_line: Option<SourceLineId>,
        lines: &[SourceLineId],
    ) {
        self.result.totals.add_samples_inclusive(count, time);
        self.result.totals.add_samples_exclusive(count, time);

        self.nodes.node_mut(top).add_samples_exclusive(count, time);
        let leaf_function = self.tree.node(top).function_id;
        self.result.functions.entry(leaf_function).or_default().add_samples_exclusive(count, time);

        self.seen_functions.clear();
        for node in self.tree.ancestors(top) {
            self.nodes.node_mut(node).add_samples_inclusive(count, time);
            let function_id = self.tree.node(node).function_id;
            if self.seen_functions.insert(function_id) {
                self.result.functions.entry(function_id).or_default().add_samples_inclusive(count, time);
            }
        }

        if let Some(line) = leaf_line {
            self.result.lines.entry(line).or_default().add_samples_exclusive(count, time);
        }
        for &line in lines {
            self.result.lines.entry(line).or_default().add_samples_inclusive(count, time);
        }
    }

    fn add_allocation(
        &mut self,
        node: NodeIndex,
        size: u64,
        line: Option<SourceLineId>,
        stack_lines: &[SourceLineId],
    ) {
        self.result.totals.add_memory_inclusive(size);
        self.result.totals.add_memory_exclusive(size);

        self.nodes.node_mut(node).add_memory_exclusive(size);
        let leaf_function = self.tree.node(node).function_id;
        self.result.functions.entry(leaf_function).or_default().add_memory_exclusive(size);

        self.seen_functions.clear();
        for ancestor in self.tree.ancestors(node) {
            self.nodes.node_mut(ancestor).add_memory_inclusive(size);
            let function_id = self.tree.node(ancestor).function_id;
            if self.seen_functions.insert(function_id) {
                self.result.functions.entry(function_id).or_default().add_memory_inclusive(size);
            }
        }

        if let Some(line) = line {
            self.result.lines.entry(line).or_default().add_memory_exclusive(size);
            if !stack_lines.contains(&line) {
                self.result.lines.entry(line).or_default().add_memory_inclusive(size);
            }
        }
        for &stack_line in stack_lines {
            self.result.lines.entry(stack_line).or_default().add_memory_inclusive(size);
        }
    }

    fn finish(mut self, thread_id: ThreadId) -> Aggregation {
        // The synthetic root holds the thread's totals as inclusive weight
        let root = self.nodes.node_mut(NodeIndex::ROOT);
        root.add_samples_inclusive(self.result.totals.samples_inclusive, self.result.totals.time_inclusive);
        root.add_memory_inclusive(self.result.totals.memory_inclusive);

        self.result.call_trees.insert(thread_id, self.nodes);
        self.result
    }
}
