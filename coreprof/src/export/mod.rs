//! Report export
//!
//! Serializes a statistics snapshot together with load diagnostics, thread
//! summaries and CPU series as pretty-printed JSON.

pub mod report;

pub use report::ReportExporter;
