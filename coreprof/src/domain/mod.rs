//! Domain model for coreprof
//!
//! This module contains core domain types and errors that provide:
//! - Compile-time safety via newtype pattern
//! - Self-documenting function signatures
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use coreprof_common::{
    AppDomainId, AssemblyId, ClassId, FunctionId, ModuleId, SourceFileId, SourceLineId, ThreadId,
    FAKE_FUNCTION_ID, HIDDEN_LINE_NUMBER, UNDEFINED_SOURCE_LINE_ID,
};
pub use types::{percent_of, Metric, ThreadSelector, TimeFrame, TimeScale};

pub use errors::{AnalysisError, LoadError, StackDesync};
