//! Structured error types for coreprof
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::path::PathBuf;
use thiserror::Error;

use coreprof_common::ThreadId;

/// Failure of a whole trace load
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to open trace file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read trace stream: {0}")]
    Read(#[from] std::io::Error),

    #[error("Background loader exited without a result")]
    LoaderDisconnected,
}

/// A stack sample that cannot be applied to the thread's current stack
///
/// Reported per sample; the sample is dropped and loading continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StackDesync {
    #[error("thread {thread}: match prefix {match_prefix} exceeds current depth {depth}")]
    PrefixTooDeep { thread: ThreadId, match_prefix: u32, depth: u32 },

    #[error(
        "thread {thread}: {frames} frames do not fill stack size {stack_size} after prefix {match_prefix}"
    )]
    FrameCountMismatch { thread: ThreadId, match_prefix: u32, stack_size: u32, frames: usize },
}

/// Failure of a statistics query
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Aggregation cancelled")]
    Cancelled,

    #[error("No statistics built yet; call build_statistics first")]
    NoStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display_names_path() {
        let err = LoadError::Io {
            path: PathBuf::from("/tmp/missing.log"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("/tmp/missing.log"));
    }

    #[test]
    fn test_desync_display() {
        let err = StackDesync::PrefixTooDeep { thread: ThreadId(0x1f), match_prefix: 4, depth: 2 };
        assert_eq!(err.to_string(), "thread 0x1f: match prefix 4 exceeds current depth 2");
    }
}
