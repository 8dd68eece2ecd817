//! Stack reconstruction: per-thread call trees rebuilt from delta samples

pub mod call_tree;
pub mod reconstruction;

pub use call_tree::{CallTree, FunctionCall, NodeIndex};
pub use reconstruction::{ResolvedSample, ThreadStack};
