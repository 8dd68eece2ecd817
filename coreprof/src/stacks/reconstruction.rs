//! Delta stack reconstruction
//!
//! A `sam str` record only carries the frames that changed since the previous
//! sample of the same thread:
//!
//! ```text
//! previous stack   A B C D          (top = D, depth 4)
//! record           2:3 0xE          (keep 2 frames, new size 3)
//! unwind           A B              (top moves up to depth 2)
//! push             A B E            (top = E, depth 3)
//! ```
//!
//! Each [`ThreadStack`] owns one call tree and a "current top" pointer into
//! it. Samples must be applied in stream order; a sample that does not fit
//! the current stack is rejected with [`StackDesync`] and leaves the state
//! untouched.

use std::sync::Arc;

use coreprof_common::{FunctionId, SourceLineId, StackSampleRecord, ThreadId};

use super::call_tree::{CallTree, NodeIndex};
use crate::domain::StackDesync;
use crate::metadata::MetadataRegistry;

/// A stack sample after reconstruction
#[derive(Debug, Clone)]
pub struct ResolvedSample {
    /// Milliseconds since the profiler time reference
    pub timestamp: u64,
    /// Sample weight in ticks
    pub count: u64,
    /// Wall-time weight in milliseconds
    pub time: u64,
    /// Node on top after unwinding, before the new frames were pushed
    pub parent: NodeIndex,
    /// Newly visited nodes, outermost first
    pub added: Vec<NodeIndex>,
    /// Leaf of the resolved stack; the root for an empty stack
    pub top: NodeIndex,
    /// Distinct source lines on the stack, outermost first
    pub lines: Arc<[SourceLineId]>,
    pub leaf_line: Option<SourceLineId>,
}

impl ResolvedSample {
    #[must_use]
    pub fn is_empty_stack(&self) -> bool {
        self.top == NodeIndex::ROOT
    }
}

/// Live stack state of one thread
#[derive(Debug)]
pub struct ThreadStack {
    thread_id: ThreadId,
    tree: CallTree,
    top: NodeIndex,
    lines: Arc<[SourceLineId]>,
    lines_dirty: bool,
}

impl ThreadStack {
    #[must_use]
    pub fn new(thread_id: ThreadId) -> Self {
        Self {
            thread_id,
            tree: CallTree::new(),
            top: NodeIndex::ROOT,
            lines: Arc::from(Vec::new()),
            lines_dirty: false,
        }
    }

    #[must_use]
    pub fn tree(&self) -> &CallTree {
        &self.tree
    }

    #[must_use]
    pub fn current_top(&self) -> NodeIndex {
        self.top
    }

    /// Function on top of the stack, `None` when the stack is empty
    #[must_use]
    pub fn top_function(&self) -> Option<FunctionId> {
        (self.top != NodeIndex::ROOT).then(|| self.tree.node(self.top).function_id)
    }

    /// Apply one delta-encoded sample
    ///
    /// `timestamp` and `time` are already converted to milliseconds. Line
    /// information for frame IPs is resolved through `registry` as frames are
    /// visited.
    pub fn apply_sample(
        &mut self,
        record: &StackSampleRecord,
        timestamp: u64,
        time: u64,
        registry: &mut MetadataRegistry,
    ) -> Result<ResolvedSample, StackDesync> {
        let depth = self.tree.node(self.top).depth;
        let too_deep = StackDesync::PrefixTooDeep {
            thread: self.thread_id,
            match_prefix: record.match_prefix,
            depth,
        };
        if record.match_prefix > depth {
            return Err(too_deep);
        }

        let pushed = record.stack_size.checked_sub(record.match_prefix);
        if pushed.and_then(|n| usize::try_from(n).ok()) != Some(record.frames.len()) {
            return Err(StackDesync::FrameCountMismatch {
                thread: self.thread_id,
                match_prefix: record.match_prefix,
                stack_size: record.stack_size,
                frames: record.frames.len(),
            });
        }

        let parent = self.tree.ancestor_at_depth(self.top, record.match_prefix).ok_or(too_deep)?;
        if parent != self.top {
            self.lines_dirty = true;
        }

        if parent != NodeIndex::ROOT {
            if let Some(ip) = record.prefix_ip.address() {
                self.set_ip(parent, Some(ip), registry);
            }
        }

        let mut current = parent;
        let mut added = Vec::with_capacity(record.frames.len());
        for frame in &record.frames {
            current = self.tree.find_or_insert_child(current, frame.function_id);
            self.set_ip(current, frame.ip, registry);
            added.push(current);
        }
        if !added.is_empty() {
            self.lines_dirty = true;
        }
        self.top = current;

        Ok(ResolvedSample {
            timestamp,
            count: record.count,
            time,
            parent,
            added,
            top: current,
            lines: self.lines_snapshot(),
            leaf_line: self.top_line(),
        })
    }

    /// Line of the frame on top of the stack
    #[must_use]
    pub fn top_line(&self) -> Option<SourceLineId> {
        self.tree.node(self.top).line
    }

    /// Distinct lines on the current stack, shared between samples until the
    /// stack changes
    pub fn lines_snapshot(&mut self) -> Arc<[SourceLineId]> {
        if self.lines_dirty {
            let mut lines: Vec<SourceLineId> = Vec::new();
            for node in self.tree.path(self.top) {
                if let Some(line) = self.tree.node(node).line {
                    if !lines.contains(&line) {
                        lines.push(line);
                    }
                }
            }
            self.lines = Arc::from(lines);
            self.lines_dirty = false;
        }
        Arc::clone(&self.lines)
    }

    fn set_ip(&mut self, node: NodeIndex, ip: Option<u64>, registry: &mut MetadataRegistry) {
        let function_id = self.tree.node(node).function_id;
        let line = ip.and_then(|ip| registry.line_for_ip(function_id, ip));
        let call = self.tree.node_mut(node);
        if call.line != line {
            self.lines_dirty = true;
        }
        call.ip = ip;
        call.line = line;
    }
}
