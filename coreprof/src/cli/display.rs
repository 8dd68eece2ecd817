//! Terminal output for the CLI

// Percentages and averages are display-only
#![allow(clippy::cast_precision_loss)]

use crate::analysis::{CallTreeNode, LineHotspot, MethodHotspot};
use crate::domain::{percent_of, Metric, ThreadId, TimeFrame};
use crate::history::CpuPoint;
use crate::profiling::{LoadDiagnostics, ThreadInfo};

/// Display the load summary and warn when data was dropped
pub fn display_diagnostics(diagnostics: &LoadDiagnostics) {
    eprintln!(
        "loaded: {} lines, {} records",
        diagnostics.lines_read, diagnostics.records_parsed
    );
    if !diagnostics.is_complete() {
        eprintln!(
            "warning: incomplete trace: {} unrecognized lines, {} dropped stack samples",
            diagnostics.unrecognized_lines, diagnostics.dropped_samples
        );
    }
}

/// Display one line per thread
pub fn display_threads(threads: &[ThreadInfo]) {
    println!("\nTHREADS");
    for thread in threads {
        let os = thread.os_thread_id.map_or_else(|| "-".to_string(), |tid| tid.to_string());
        let state = if thread.destroyed { " (destroyed)" } else { "" };
        println!(
            "  {:<10} os={os:<8} samples={:<8} nodes={}{state}",
            thread.id.to_string(),
            thread.samples,
            thread.call_tree_nodes
        );
    }
}

pub fn display_methods(rows: &[MethodHotspot], metric: Metric, window: TimeFrame) {
    println!("\nTOP METHODS by {} {window}", metric.label());
    println!("{}", "─".repeat(72));
    if rows.is_empty() {
        println!("  (no samples in window)");
    }
    for row in rows {
        println!("  {:<52} {:>6.1}% {:>10}", row.name, row.percentage, row.value);
    }
}

pub fn display_lines(rows: &[LineHotspot], metric: Metric) {
    println!("\nTOP LINES by {}", metric.label());
    println!("{}", "─".repeat(72));
    for row in rows {
        let file = row.file.as_deref().unwrap_or("<unknown file>");
        let location = format!("{file}:{}:{}", row.line, row.column);
        println!("  {location:<40} {:<20} {:>6.1}% {:>8}", row.function_name, row.percentage, row.value);
    }
}

/// Display a call tree, one node per line, indented by depth
pub fn display_call_tree(thread: ThreadId, tree: &CallTreeNode, metric: Metric) {
    let total = tree.statistics.value(metric);
    println!("\nCALL TREE thread {thread} by {}", metric.label());
    for (depth, node) in tree.walk().skip(1) {
        let value = node.statistics.value(metric);
        println!(
            "  {:indent$}{} {:.1}% ({value})",
            "",
            node.name,
            percent_of(value, total),
            indent = (depth - 1) * 2
        );
    }
}

/// Display a CPU series with its average
pub fn display_cpu(label: &str, points: &[CpuPoint]) {
    if points.is_empty() {
        println!("\nCPU {label}: no data");
        return;
    }
    let average = points.iter().map(|p| p.utilization).sum::<f64>() / points.len() as f64;
    println!("\nCPU {label}: {} points, average {average:.1}%", points.len());
    for point in points {
        let marker = match (point.paused, point.resumed) {
            (true, _) => " [paused]",
            (_, true) => " [resumed]",
            _ => "",
        };
        println!("  {:>10}ms {:>5.1}%{marker}", point.timestamp, point.utilization);
    }
}
