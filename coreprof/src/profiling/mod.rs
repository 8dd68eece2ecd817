//! Loading pipeline
//!
//! Turns a stream of parsed records into an immutable [`TraceModel`]:
//! - Trace loading (file or reader)
//! - Record routing and per-thread stack reconstruction
//! - Load diagnostics

pub mod diagnostics;
pub mod event_processor;
pub mod loader;
pub mod model;
pub mod thread;

pub use diagnostics::LoadDiagnostics;
pub use event_processor::EventProcessor;
pub use loader::{load_trace, load_trace_file};
pub use model::TraceModel;
pub use thread::{ThreadData, ThreadInfo};
