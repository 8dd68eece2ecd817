//! Per-thread call tree
//!
//! Nodes live in an arena and refer to each other by [`NodeIndex`]. The tree
//! only grows while a trace is loaded: a node is created the first time a
//! function appears under a given parent and is never removed, so indices
//! held by resolved samples stay valid.

use serde::Serialize;

use coreprof_common::{FunctionId, SourceLineId, FAKE_FUNCTION_ID};

/// Index of a node inside its thread's [`CallTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeIndex(pub usize);

impl NodeIndex {
    /// The synthetic root of every tree
    pub const ROOT: NodeIndex = NodeIndex(0);

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One occurrence of a function at one position of the call stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub function_id: FunctionId,
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
    /// Number of frames from the root; the root itself is depth 0
    pub depth: u32,
    /// Last instruction pointer reported for this frame
    pub ip: Option<u64>,
    /// Source line resolved from `ip`
    pub line: Option<SourceLineId>,
}

#[derive(Debug, Clone)]
pub struct CallTree {
    nodes: Vec<FunctionCall>,
}

impl Default for CallTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CallTree {
    #[must_use]
    pub fn new() -> Self {
        let root = FunctionCall {
            function_id: FAKE_FUNCTION_ID,
            parent: None,
            children: Vec::new(),
            depth: 0,
            ip: None,
            line: None,
        };
        Self { nodes: vec![root] }
    }

    #[must_use]
    pub fn root(&self) -> NodeIndex {
        NodeIndex::ROOT
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds its root; empty means "root only"
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Node at `index`
    ///
    /// Indices only come from this tree, so an out-of-range index is a bug.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> &FunctionCall {
        &self.nodes[index.index()]
    }

    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> &mut FunctionCall {
        &mut self.nodes[index.index()]
    }

    #[must_use]
    pub fn get(&self, index: NodeIndex) -> Option<&FunctionCall> {
        self.nodes.get(index.index())
    }

    /// Child of `parent` for `function_id`, created on first use
    ///
    /// At most one child exists per (parent, function) pair, so re-entering
    /// a function at the same position reuses its node.
    pub fn find_or_insert_child(&mut self, parent: NodeIndex, function_id: FunctionId) -> NodeIndex {
        if let Some(child) = self.find_child(parent, function_id) {
            return child;
        }

        let index = NodeIndex(self.nodes.len());
        let depth = self.node(parent).depth + 1;
        self.nodes.push(FunctionCall {
            function_id,
            parent: Some(parent),
            children: Vec::new(),
            depth,
            ip: None,
            line: None,
        });
        self.node_mut(parent).children.push(index);
        index
    }

    #[must_use]
    pub fn find_child(&self, parent: NodeIndex, function_id: FunctionId) -> Option<NodeIndex> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.node(child).function_id == function_id)
    }

    /// `node` and its ancestors up to, but excluding, the root
    pub fn ancestors(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        std::iter::successors(Some(node), |&n| self.node(n).parent)
            .take_while(|&n| n != NodeIndex::ROOT)
    }

    /// Ancestor of `node` at `depth`, or `None` if `node` is shallower
    #[must_use]
    pub fn ancestor_at_depth(&self, node: NodeIndex, depth: u32) -> Option<NodeIndex> {
        let mut current = node;
        while self.node(current).depth > depth {
            current = self.node(current).parent?;
        }
        (self.node(current).depth == depth).then_some(current)
    }

    /// Node indices from the first frame below the root down to `node`
    #[must_use]
    pub fn path(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut path: Vec<NodeIndex> = self.ancestors(node).collect();
        path.reverse();
        path
    }

    /// Resolved stack at `node`, root to leaf, as function ids
    #[must_use]
    pub fn stack(&self, node: NodeIndex) -> Vec<FunctionId> {
        self.path(node).into_iter().map(|n| self.node(n).function_id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &FunctionCall)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIndex(i), node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tree_has_fake_root() {
        let tree = CallTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.node(tree.root()).function_id, FAKE_FUNCTION_ID);
        assert_eq!(tree.node(tree.root()).depth, 0);
    }

    #[test]
    fn test_children_are_keyed_by_function() {
        let mut tree = CallTree::new();
        let a = tree.find_or_insert_child(NodeIndex::ROOT, FunctionId(0x10));
        let again = tree.find_or_insert_child(NodeIndex::ROOT, FunctionId(0x10));
        let b = tree.find_or_insert_child(NodeIndex::ROOT, FunctionId(0x20));

        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(tree.node(NodeIndex::ROOT).children, vec![a, b]);
    }

    #[test]
    fn test_same_function_under_different_parents() {
        let mut tree = CallTree::new();
        let a = tree.find_or_insert_child(NodeIndex::ROOT, FunctionId(1));
        let nested = tree.find_or_insert_child(a, FunctionId(1));

        assert_ne!(a, nested);
        assert_eq!(tree.node(nested).depth, 2);
        assert_eq!(tree.stack(nested), vec![FunctionId(1), FunctionId(1)]);
    }

    #[test]
    fn test_ancestors_exclude_root() {
        let mut tree = CallTree::new();
        let a = tree.find_or_insert_child(NodeIndex::ROOT, FunctionId(1));
        let b = tree.find_or_insert_child(a, FunctionId(2));
        let c = tree.find_or_insert_child(b, FunctionId(3));

        assert_eq!(tree.ancestors(c).collect::<Vec<_>>(), vec![c, b, a]);
        assert_eq!(tree.ancestors(NodeIndex::ROOT).count(), 0);
        assert_eq!(tree.path(c), vec![a, b, c]);
    }

    #[test]
    fn test_ancestor_at_depth() {
        let mut tree = CallTree::new();
        let a = tree.find_or_insert_child(NodeIndex::ROOT, FunctionId(1));
        let b = tree.find_or_insert_child(a, FunctionId(2));

        assert_eq!(tree.ancestor_at_depth(b, 1), Some(a));
        assert_eq!(tree.ancestor_at_depth(b, 0), Some(NodeIndex::ROOT));
        assert_eq!(tree.ancestor_at_depth(a, 2), None);
    }

    #[test]
    fn test_every_node_gets_its_own_index() {
        let mut tree = CallTree::new();
        let mut parent = NodeIndex::ROOT;
        for id in 0..64 {
            parent = tree.find_or_insert_child(parent, FunctionId(id));
        }

        let indices: Vec<NodeIndex> = tree.iter().map(|(index, _)| index).collect();
        let expected: Vec<NodeIndex> = (0..tree.len()).map(NodeIndex).collect();
        assert_eq!(indices, expected);
        assert_eq!(parent, NodeIndex(64));
        assert_eq!(tree.node(parent).function_id, FunctionId(63));
    }
}
