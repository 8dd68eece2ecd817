//! Ranked method and source-line tables
//!
//! Flat projections of an [`Aggregation`]: one row per function or per
//! source line, ranked by a chosen [`Metric`].
//!
//! # Display
//!
//! ```text
//! TOP METHODS by samples (incl)
//! ─────────────────────────────────────────────
//!   App.Program.Main                 100.0%   412
//!   App.Parser.ParseDocument          63.1%   260
//!   System.IO.StreamReader.ReadLine   21.8%    90
//! ```
//!
//! # Ordering
//!
//! Rows are sorted by descending metric value; equal values are ordered by
//! ascending id, so the same aggregation always ranks the same way.

use serde::Serialize;
use std::cmp::Reverse;

use coreprof_common::{FunctionId, SourceLineId};

use super::aggregator::Aggregation;
use super::statistics::Statistics;
use crate::domain::{percent_of, Metric};
use crate::metadata::MetadataRegistry;

// =============================================================================
// METHOD HOTSPOT
// =============================================================================

/// One row of the method table
#[derive(Debug, Clone, Serialize)]
pub struct MethodHotspot {
    pub function_id: FunctionId,

    /// Full function name, or a placeholder for functions never named.
    pub name: String,

    /// Name of the declaring class, if known.
    pub class_name: Option<String>,

    pub statistics: Statistics,

    /// Value of the ranking metric.
    pub value: u64,

    /// Percentage of the window's total for the ranking metric (0.0 - 100.0).
    pub percentage: f64,
}

/// Rank functions by `metric`, keeping at most `limit` rows
#[must_use]
pub fn top_methods(
    aggregation: &Aggregation,
    registry: &MetadataRegistry,
    metric: Metric,
    limit: Option<usize>,
) -> Vec<MethodHotspot> {
    let total = aggregation.totals.value(metric);
    let mut ranked: Vec<(FunctionId, Statistics)> =
        aggregation.functions.iter().map(|(&id, &stats)| (id, stats)).collect();
    ranked.sort_by_key(|(id, stats)| (Reverse(stats.value(metric)), *id));
    ranked.truncate(limit.unwrap_or(usize::MAX));

    ranked
        .into_iter()
        .map(|(function_id, statistics)| {
            let value = statistics.value(metric);
            let class_name = registry
                .function(function_id)
                .and_then(|f| f.class_id)
                .and_then(|class_id| registry.class(class_id))
                .and_then(|class| class.name.clone());
            MethodHotspot {
                function_id,
                name: registry.function_name(function_id).into_owned(),
                class_name,
                statistics,
                value,
                percentage: percent_of(value, total),
            }
        })
        .collect()
}

// =============================================================================
// LINE HOTSPOT
// =============================================================================

/// One row of the source-line table
#[derive(Debug, Clone, Serialize)]
pub struct LineHotspot {
    pub line_id: SourceLineId,
    pub function_id: FunctionId,
    pub function_name: String,
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
    pub statistics: Statistics,
    pub value: u64,
    pub percentage: f64,
}

/// Rank source lines by `metric`, keeping at most `limit` rows
#[must_use]
pub fn top_lines(
    aggregation: &Aggregation,
    registry: &MetadataRegistry,
    metric: Metric,
    limit: Option<usize>,
) -> Vec<LineHotspot> {
    let total = aggregation.totals.value(metric);
    let mut ranked: Vec<(SourceLineId, Statistics)> =
        aggregation.lines.iter().map(|(&id, &stats)| (id, stats)).collect();
    ranked.sort_by_key(|(id, stats)| (Reverse(stats.value(metric)), *id));
    ranked.truncate(limit.unwrap_or(usize::MAX));

    ranked
        .into_iter()
        .filter_map(|(line_id, statistics)| {
            // Every aggregated line id was interned by the same registry
            let source = registry.source_line(line_id)?;
            let value = statistics.value(metric);
            Some(LineHotspot {
                line_id,
                function_id: source.function_id,
                function_name: registry.function_name(source.function_id).into_owned(),
                file: registry.line_file_name(line_id).map(str::to_string),
                line: source.start_line,
                column: source.start_column,
                statistics,
                value,
                percentage: percent_of(value, total),
            })
        })
        .collect()
}
