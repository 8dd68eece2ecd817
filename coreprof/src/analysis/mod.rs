//! Analysis of a loaded trace
//!
//! Pure functions over an immutable [`TraceModel`](crate::profiling::TraceModel):
//! windowed aggregation, ranked tables and the presentation call tree.

pub mod aggregator;
pub mod call_tree_view;
pub mod cancel;
pub mod hotspot_analyzer;
pub mod statistics;

pub use aggregator::{aggregate, aggregate_thread, Aggregation, NodeStatistics};
pub use call_tree_view::{build_call_tree, CallTreeNode};
pub use cancel::CancellationToken;
pub use hotspot_analyzer::{top_lines, top_methods, LineHotspot, MethodHotspot};
pub use statistics::{Statistics, Unattributed};
