//! Core Profiler trace parsing
//!
//! - `patterns`: anchored line patterns and tail sub-patterns
//! - `record_parser`: pure line → [`Record`](coreprof_common::Record) conversion
//! - `reader`: streaming, order-preserving iterator over a trace

pub mod patterns;
pub mod record_parser;
pub mod reader;

pub use reader::{LineEcho, TraceReader};
pub use record_parser::parse_line;
