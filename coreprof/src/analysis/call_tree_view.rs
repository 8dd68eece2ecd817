//! Presentation call tree
//!
//! Projects a thread's live call tree and its [`NodeStatistics`] into an
//! owned tree restricted to the nodes reached inside the window. Children
//! are ordered by descending value of the chosen metric; ties keep the order
//! in which the nodes were first created.

use serde::Serialize;

use coreprof_common::{FunctionId, SourceLineId};

use super::aggregator::NodeStatistics;
use super::statistics::Statistics;
use crate::domain::Metric;
use crate::metadata::MetadataRegistry;
use crate::stacks::{CallTree, NodeIndex};

#[derive(Debug, Clone, Serialize)]
pub struct CallTreeNode {
    pub node: NodeIndex,
    pub function_id: FunctionId,
    pub name: String,
    pub line: Option<SourceLineId>,
    pub statistics: Statistics,
    pub children: Vec<CallTreeNode>,
}

impl CallTreeNode {
    /// Number of nodes in this subtree, including itself
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(CallTreeNode::size).sum::<usize>()
    }

    /// Depth-first walk yielding `(depth, node)`, children in display order
    pub fn walk(&self) -> impl Iterator<Item = (usize, &CallTreeNode)> {
        let mut pending = vec![(0usize, self)];
        std::iter::from_fn(move || {
            let (depth, node) = pending.pop()?;
            pending.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
            Some((depth, node))
        })
    }
}

/// Build the sorted presentation tree rooted at the synthetic root
#[must_use]
pub fn build_call_tree(
    tree: &CallTree,
    statistics: &NodeStatistics,
    registry: &MetadataRegistry,
    metric: Metric,
) -> CallTreeNode {
    build_node(tree, NodeIndex::ROOT, statistics, registry, metric)
}

fn build_node(
    tree: &CallTree,
    index: NodeIndex,
    statistics: &NodeStatistics,
    registry: &MetadataRegistry,
    metric: Metric,
) -> CallTreeNode {
    let call = tree.node(index);
    let mut children: Vec<CallTreeNode> = call
        .children
        .iter()
        .copied()
        .filter(|&child| statistics.is_reached(child))
        .map(|child| build_node(tree, child, statistics, registry, metric))
        .collect();
    // Stable: equal values keep arena child order
    children.sort_by_key(|child| std::cmp::Reverse(child.statistics.value(metric)));

    let name = if index == NodeIndex::ROOT {
        "<root>".to_string()
    } else {
        registry.function_name(call.function_id).into_owned()
    };

    CallTreeNode {
        node: index,
        function_id: call.function_id,
        name,
        line: call.line,
        statistics: statistics.get(index),
        children,
    }
}
