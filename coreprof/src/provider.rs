//! # Data Provider
//!
//! Orchestration layer between a loaded trace and its consumers (CLI, report
//! export, host applications).
//!
//! ```text
//! load / load_from_reader / load_in_background
//!         │
//!         ▼
//!   Arc<TraceModel>  (immutable)
//!         │  build_statistics(window)
//!         ▼
//!   StatisticsSnapshot  (cached per window)
//!         │
//!         ├──► top_methods / top_lines
//!         └──► call_tree
//! ```
//!
//! A snapshot holds one [`Aggregation`] per thread plus their merge, so the
//! per-thread and all-threads queries are answered without re-aggregating.
//! Rebuilding for the same window reuses the cached snapshot.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{bounded, Receiver};
use log::{debug, info};

use coreprof_common::ThreadId;

use crate::analysis::{
    aggregate_thread, build_call_tree, top_lines, top_methods, Aggregation, CallTreeNode,
    CancellationToken, LineHotspot, MethodHotspot,
};
use crate::config::AnalysisConfig;
use crate::domain::{AnalysisError, LoadError, Metric, TimeFrame};
use crate::history::CpuPoint;
use crate::profiling::{load_trace, load_trace_file, LoadDiagnostics, ThreadInfo, TraceModel};

/// Aggregations of every thread for one window
#[derive(Debug, Clone)]
pub struct StatisticsSnapshot {
    pub window: TimeFrame,
    pub all: Aggregation,
    pub per_thread: BTreeMap<ThreadId, Aggregation>,
}

impl StatisticsSnapshot {
    /// Aggregation for one thread, or for all threads when `thread` is `None`
    ///
    /// Returns `None` for a thread the trace never mentioned.
    #[must_use]
    pub fn aggregation(&self, thread: Option<ThreadId>) -> Option<&Aggregation> {
        match thread {
            None => Some(&self.all),
            Some(id) => self.per_thread.get(&id),
        }
    }
}

pub struct DataProvider {
    model: Arc<TraceModel>,
    snapshot: Mutex<Option<Arc<StatisticsSnapshot>>>,
}

impl DataProvider {
    #[must_use]
    pub fn new(model: TraceModel) -> Self {
        Self { model: Arc::new(model), snapshot: Mutex::new(None) }
    }

    /// Load a trace file on the calling thread
    ///
    /// # Errors
    /// Fails if the file cannot be opened or read.
    pub fn load(path: &Path, config: AnalysisConfig) -> Result<Self, LoadError> {
        load_trace_file(path, config).map(Self::new)
    }

    /// Load a trace from any buffered reader
    ///
    /// # Errors
    /// Fails if the reader fails.
    pub fn load_from_reader<R: BufRead>(input: R, config: AnalysisConfig) -> Result<Self, LoadError> {
        load_trace(input, config).map(Self::new)
    }

    /// Load a trace file on a worker thread
    ///
    /// The receiver yields exactly one result once loading finishes.
    #[must_use]
    pub fn load_in_background(
        path: PathBuf,
        config: AnalysisConfig,
    ) -> Receiver<Result<Self, LoadError>> {
        let (tx, rx) = bounded(1);
        std::thread::spawn(move || {
            let result = Self::load(&path, config);
            // Receiver may have been dropped by a host that lost interest
            let _ = tx.send(result);
        });
        rx
    }

    /// Block until a background load delivers its result
    ///
    /// # Errors
    /// Returns the load error, or [`LoadError::LoaderDisconnected`] if the
    /// worker exited without sending anything.
    pub fn wait_for(rx: &Receiver<Result<Self, LoadError>>) -> Result<Self, LoadError> {
        rx.recv().map_err(|_| LoadError::LoaderDisconnected)?
    }

    #[must_use]
    pub fn model(&self) -> &TraceModel {
        &self.model
    }

    /// Shared handle to the model for concurrent read-only queries
    #[must_use]
    pub fn shared_model(&self) -> Arc<TraceModel> {
        Arc::clone(&self.model)
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    /// Aggregate every thread over `window`, reusing the cached snapshot
    /// when the window has not changed
    ///
    /// # Errors
    /// See [`build_statistics_cancellable`](Self::build_statistics_cancellable).
    pub fn build_statistics(&self, window: TimeFrame) -> Result<Arc<StatisticsSnapshot>, AnalysisError> {
        if let Some(snapshot) = self.cached().filter(|s| s.window == window) {
            debug!("Reusing statistics for {window}");
            return Ok(snapshot);
        }
        self.build_statistics_cancellable(window, &CancellationToken::new())
    }

    /// Aggregate every thread over `window`, polling `token` between samples
    ///
    /// On cancellation the previous snapshot stays current.
    ///
    /// # Errors
    /// Returns [`AnalysisError::Cancelled`] if `token` is cancelled.
    pub fn build_statistics_cancellable(
        &self,
        window: TimeFrame,
        token: &CancellationToken,
    ) -> Result<Arc<StatisticsSnapshot>, AnalysisError> {
        let mut all = Aggregation::empty(window);
        let mut per_thread = BTreeMap::new();
        if !window.is_empty() {
            for thread in self.model.threads.values() {
                let aggregation = aggregate_thread(thread, window, token)?;
                all.merge(aggregation.clone());
                per_thread.insert(thread.id, aggregation);
            }
        }
        info!(
            "Built statistics for {window}: {} samples across {} threads",
            all.totals.samples_inclusive,
            per_thread.len()
        );

        let snapshot = Arc::new(StatisticsSnapshot { window, all, per_thread });
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Most recently built snapshot
    #[must_use]
    pub fn cached(&self) -> Option<Arc<StatisticsSnapshot>> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn current(&self) -> Result<Arc<StatisticsSnapshot>, AnalysisError> {
        self.cached().ok_or(AnalysisError::NoStatistics)
    }

    // ------------------------------------------------------------------
    // Queries over the current snapshot
    // ------------------------------------------------------------------

    /// Ranked method table for one thread or all threads
    ///
    /// # Errors
    /// Returns [`AnalysisError::NoStatistics`] before the first build.
    pub fn top_methods(
        &self,
        thread: Option<ThreadId>,
        metric: Metric,
        limit: Option<usize>,
    ) -> Result<Vec<MethodHotspot>, AnalysisError> {
        let snapshot = self.current()?;
        Ok(snapshot
            .aggregation(thread)
            .map(|a| top_methods(a, &self.model.registry, metric, limit))
            .unwrap_or_default())
    }

    /// Ranked source-line table for one thread or all threads
    ///
    /// # Errors
    /// Returns [`AnalysisError::NoStatistics`] before the first build.
    pub fn top_lines(
        &self,
        thread: Option<ThreadId>,
        metric: Metric,
        limit: Option<usize>,
    ) -> Result<Vec<LineHotspot>, AnalysisError> {
        let snapshot = self.current()?;
        Ok(snapshot
            .aggregation(thread)
            .map(|a| top_lines(a, &self.model.registry, metric, limit))
            .unwrap_or_default())
    }

    /// Sorted call tree of one thread, `None` for an unknown thread
    ///
    /// # Errors
    /// Returns [`AnalysisError::NoStatistics`] before the first build.
    pub fn call_tree(
        &self,
        thread: ThreadId,
        metric: Metric,
    ) -> Result<Option<CallTreeNode>, AnalysisError> {
        let snapshot = self.current()?;
        let Some(data) = self.model.thread(thread) else {
            return Ok(None);
        };
        let tree = snapshot
            .per_thread
            .get(&thread)
            .and_then(|a| a.call_trees.get(&thread))
            .map(|stats| build_call_tree(data.tree(), stats, &self.model.registry, metric));
        Ok(tree)
    }

    // ------------------------------------------------------------------
    // Load-time data
    // ------------------------------------------------------------------

    #[must_use]
    pub fn application_cpu_utilization(&self) -> &[CpuPoint] {
        self.model.process_cpu.points()
    }

    #[must_use]
    pub fn thread_cpu_utilization(&self, thread: ThreadId) -> Option<&[CpuPoint]> {
        self.model.thread(thread).map(|t| t.cpu.points())
    }

    #[must_use]
    pub fn diagnostics(&self) -> &LoadDiagnostics {
        &self.model.diagnostics
    }

    #[must_use]
    pub fn threads(&self) -> Vec<ThreadInfo> {
        self.model.thread_infos()
    }
}
