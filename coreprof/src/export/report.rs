use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

use crate::analysis::{
    build_call_tree, top_lines, top_methods, CallTreeNode, LineHotspot, MethodHotspot, Statistics,
    Unattributed,
};
use crate::domain::{Metric, TimeFrame};
use crate::history::CpuPoint;
use crate::profiling::{LoadDiagnostics, ThreadInfo, TraceModel};
use crate::provider::StatisticsSnapshot;

/// Report container
#[derive(Debug, Serialize)]
struct Report<'a> {
    window: TimeFrame,
    metric: Metric,
    totals: Statistics,
    unattributed: Unattributed,
    diagnostics: &'a LoadDiagnostics,
    application_cpu: &'a [CpuPoint],
    methods: Vec<MethodHotspot>,
    lines: Vec<LineHotspot>,
    threads: Vec<ThreadReport<'a>>,
}

#[derive(Debug, Serialize)]
struct ThreadReport<'a> {
    #[serde(flatten)]
    info: ThreadInfo,
    totals: Statistics,
    cpu: &'a [CpuPoint],
    /// Omitted unless call trees were requested
    #[serde(skip_serializing_if = "Option::is_none")]
    call_tree: Option<CallTreeNode>,
}

/// JSON report exporter for one statistics snapshot
pub struct ReportExporter {
    /// Metric used to rank tables and order call-tree children
    metric: Metric,
    /// Maximum rows per table (`None` = all)
    limit: Option<usize>,
    include_call_trees: bool,
}

impl ReportExporter {
    #[must_use]
    pub fn new(metric: Metric) -> Self {
        Self { metric, limit: None, include_call_trees: false }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_call_trees(mut self) -> Self {
        self.include_call_trees = true;
        self
    }

    /// Export the report to any writer (file, stdout, buffer, etc.)
    ///
    /// # Errors
    /// Returns an error if serialization or the writer fails.
    pub fn export<W: Write>(
        &self,
        model: &TraceModel,
        snapshot: &StatisticsSnapshot,
        writer: W,
    ) -> Result<()> {
        let threads = model
            .threads
            .values()
            .map(|thread| {
                let aggregation = snapshot.per_thread.get(&thread.id);
                let call_tree = aggregation
                    .filter(|_| self.include_call_trees)
                    .and_then(|a| a.call_trees.get(&thread.id))
                    .map(|stats| build_call_tree(thread.tree(), stats, &model.registry, self.metric));
                ThreadReport {
                    info: thread.info(),
                    totals: aggregation.map(|a| a.totals).unwrap_or_default(),
                    cpu: thread.cpu.points(),
                    call_tree,
                }
            })
            .collect();

        let report = Report {
            window: snapshot.window,
            metric: self.metric,
            totals: snapshot.all.totals,
            unattributed: snapshot.all.unattributed,
            diagnostics: &model.diagnostics,
            application_cpu: model.process_cpu.points(),
            methods: top_methods(&snapshot.all, &model.registry, self.metric, self.limit),
            lines: top_lines(&snapshot.all, &model.registry, self.metric, self.limit),
            threads,
        };

        serde_json::to_writer_pretty(writer, &report).context("Failed to write report JSON")?;

        Ok(())
    }
}
