//! Cooperative cancellation of long aggregations

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::AnalysisError;

/// Shared flag polled by the aggregator between samples
///
/// Clones share the flag, so a host keeps one clone and hands another to the
/// query it may want to abandon.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// # Errors
    /// Returns [`AnalysisError::Cancelled`] once [`cancel`](Self::cancel) was called.
    pub fn check(&self) -> Result<(), AnalysisError> {
        if self.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }
}
