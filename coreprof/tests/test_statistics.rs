use coreprof::analysis::{aggregate, Aggregation, CancellationToken};
use coreprof::domain::{
    AnalysisError, ClassId, FunctionId, Metric, ThreadId, ThreadSelector, TimeFrame,
};
use coreprof::profiling::{load_trace, TraceModel};
use coreprof::stacks::NodeIndex;
use coreprof::{AnalysisConfig, DataProvider};
use std::io::Cursor;

const TRACE: &str = include_str!("fixtures/simple_trace.log");

const MAIN: FunctionId = FunctionId(0x10);
const PARSE: FunctionId = FunctionId(0x20);
const WRITE: FunctionId = FunctionId(0x30);

const METRIC_PAIRS: [(Metric, Metric); 3] = [
    (Metric::SamplesInclusive, Metric::SamplesExclusive),
    (Metric::TimeInclusive, Metric::TimeExclusive),
    (Metric::MemoryInclusive, Metric::MemoryExclusive),
];

fn model() -> TraceModel {
    load_trace(Cursor::new(TRACE), AnalysisConfig::default()).unwrap()
}

fn provider() -> DataProvider {
    DataProvider::load_from_reader(Cursor::new(TRACE), AnalysisConfig::default()).unwrap()
}

fn all(model: &TraceModel, window: TimeFrame) -> Aggregation {
    aggregate(model, ThreadSelector::All, window, &CancellationToken::new()).unwrap()
}

#[test]
fn test_fixture_load_diagnostics() {
    let model = model();
    let diagnostics = &model.diagnostics;
    assert_eq!(diagnostics.lines_read, 30);
    assert_eq!(diagnostics.records_parsed, 29);
    assert_eq!(diagnostics.unrecognized_lines, 1);
    assert_eq!(diagnostics.dropped_samples, 0);
    assert_eq!(diagnostics.empty_stack_samples, 1);
    // The garbage line marks the load as incomplete
    assert!(!diagnostics.is_complete());
}

#[test]
fn test_fixture_threads() {
    let model = model();
    let threads = model.thread_infos();
    assert_eq!(threads.len(), 2);

    assert_eq!(threads[0].id, ThreadId(1));
    assert_eq!(threads[0].runtime_id, Some(0x7000));
    assert_eq!(threads[0].os_thread_id, Some(4242));
    assert_eq!(threads[0].samples, 4);
    assert_eq!(threads[0].allocations, 1);
    assert!(!threads[0].destroyed);
    assert!(threads[1].destroyed);
}

#[test]
fn test_function_statistics() {
    let model = model();
    let result = all(&model, TimeFrame::unbounded());

    let main = result.function(MAIN);
    assert_eq!((main.samples_exclusive, main.samples_inclusive), (1, 4));
    assert_eq!((main.time_exclusive, main.time_inclusive), (10, 40));
    assert_eq!((main.memory_exclusive, main.memory_inclusive), (0, 96));

    let parse = result.function(PARSE);
    assert_eq!((parse.samples_exclusive, parse.samples_inclusive), (2, 2));
    assert_eq!((parse.memory_exclusive, parse.memory_inclusive), (96, 96));

    // Write runs on both threads
    let write = result.function(WRITE);
    assert_eq!((write.samples_exclusive, write.samples_inclusive), (2, 2));

    assert_eq!(result.totals.samples_inclusive, 5);
    assert_eq!(result.totals.samples_exclusive, 5);
    assert_eq!(result.totals.memory_inclusive, 96);
    assert_eq!(result.unattributed.samples, 1);
    assert_eq!(result.unattributed.time, 10);
}

#[test]
fn test_inclusive_never_below_exclusive() {
    let model = model();
    let result = all(&model, TimeFrame::unbounded());
    for stats in result.functions.values().chain(result.lines.values()) {
        for (incl, excl) in METRIC_PAIRS {
            assert!(stats.value(incl) >= stats.value(excl));
        }
    }
}

#[test]
fn test_exclusive_weight_is_conserved() {
    let model = model();
    let result = all(&model, TimeFrame::unbounded());
    for metric in [Metric::SamplesExclusive, Metric::TimeExclusive, Metric::MemoryExclusive] {
        let sum: u64 = result.functions.values().map(|s| s.value(metric)).sum();
        assert_eq!(sum, result.totals.value(metric), "{metric:?}");
    }
}

#[test]
fn test_root_children_sum_to_thread_totals() {
    let model = model();
    let result = aggregate(
        &model,
        ThreadSelector::Thread(ThreadId(1)),
        TimeFrame::unbounded(),
        &CancellationToken::new(),
    )
    .unwrap();
    let tree = model.thread(ThreadId(1)).unwrap().tree();
    let nodes = &result.call_trees[&ThreadId(1)];
    assert_eq!(result.totals.memory_inclusive, 96);

    for (inclusive, _) in METRIC_PAIRS {
        let children: u64 = tree
            .node(NodeIndex::ROOT)
            .children
            .iter()
            .map(|&child| nodes.get(child).value(inclusive))
            .sum();
        assert_eq!(children, result.totals.value(inclusive), "{inclusive:?}");
        assert_eq!(nodes.get(NodeIndex::ROOT).value(inclusive), result.totals.value(inclusive));
    }
    assert_eq!(nodes.get(NodeIndex::ROOT).samples_inclusive, 4);
}

#[test]
fn test_tree_nodes_inclusive_never_below_exclusive() {
    let model = model();
    let result = all(&model, TimeFrame::unbounded());

    for thread in [ThreadId(1), ThreadId(2)] {
        let tree = model.thread(thread).unwrap().tree();
        let nodes = &result.call_trees[&thread];
        for (index, _) in tree.iter() {
            let stats = nodes.get(index);
            for (inclusive, exclusive) in METRIC_PAIRS {
                assert!(
                    stats.value(inclusive) >= stats.value(exclusive),
                    "thread {thread} node {index:?} {inclusive:?}"
                );
            }
        }
    }
}

#[test]
fn test_narrower_window_never_increases_values() {
    let model = model();
    let wide = all(&model, TimeFrame::new(0, 1000));
    let narrow = all(&model, TimeFrame::new(150, 250));

    for (id, stats) in &narrow.functions {
        let outer = wide.function(*id);
        for metric in Metric::ALL {
            assert!(stats.value(metric) <= outer.value(metric));
        }
    }
    assert_eq!(narrow.function(MAIN).samples_inclusive, 2);
    assert_eq!(narrow.function(PARSE).samples_exclusive, 2);
    assert_eq!(narrow.function(WRITE).samples_inclusive, 0);
}

#[test]
fn test_window_bounds_are_inclusive() {
    let model = model();
    let result = all(&model, TimeFrame::new(200, 300));
    assert_eq!(result.totals.samples_inclusive, 4);
}

#[test]
fn test_inverted_window_is_empty() {
    let provider = provider();
    let snapshot = provider.build_statistics(TimeFrame::new(500, 400)).unwrap();

    assert!(snapshot.all.totals.is_zero());
    assert!(snapshot.all.is_empty());
    assert!(provider.top_methods(None, Metric::SamplesInclusive, None).unwrap().is_empty());
    assert!(provider.top_lines(None, Metric::TimeExclusive, None).unwrap().is_empty());
}

#[test]
fn test_recursive_function_counted_once_in_flat_table() {
    let model = load_trace(
        Cursor::new("sam str 0x1 100 1 0:3 0x10 0x20 0x10\n"),
        AnalysisConfig::default(),
    )
    .unwrap();
    let result = all(&model, TimeFrame::unbounded());
    assert_eq!(result.function(MAIN).samples_inclusive, 1);
    assert_eq!(result.function(MAIN).samples_exclusive, 1);
    assert_eq!(result.function(PARSE).samples_inclusive, 1);
}

#[test]
fn test_line_statistics() {
    let provider = provider();
    provider.build_statistics(TimeFrame::unbounded()).unwrap();
    let rows = provider.top_lines(None, Metric::SamplesInclusive, None).unwrap();

    let summary: Vec<(u32, u64)> = rows.iter().map(|r| (r.line, r.value)).collect();
    assert_eq!(summary, vec![(12, 3), (20, 2), (10, 1)]);
    assert_eq!(rows[0].file.as_deref(), Some("Program.cs"));
    assert_eq!(rows[1].function_name, "App.Program.Parse");

    let memory = provider.top_lines(None, Metric::MemoryExclusive, Some(1)).unwrap();
    assert_eq!((memory[0].line, memory[0].value), (20, 96));
}

#[test]
fn test_method_table_names_and_percentages() {
    let provider = provider();
    provider.build_statistics(TimeFrame::unbounded()).unwrap();
    let rows = provider.top_methods(Some(ThreadId(1)), Metric::SamplesInclusive, None).unwrap();

    assert_eq!(rows[0].name, "App.Program.Main");
    assert_eq!(rows[0].class_name.as_deref(), Some("App.Program"));
    assert!((rows[0].percentage - 100.0).abs() < f64::EPSILON);
    assert!((rows[1].percentage - 50.0).abs() < f64::EPSILON);
}

#[test]
fn test_allocation_and_gc_history() {
    let model = model();
    assert_eq!(model.allocations.totals(ClassId(4), TimeFrame::unbounded()), (3, 96));
    assert_eq!(model.allocations.totals(ClassId(4), TimeFrame::new(0, 100)), (0, 0));

    let snapshots = model.gc.snapshots();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].total_size(), 320);
}

#[test]
fn test_cancelled_aggregation_returns_no_result() {
    let model = model();
    let token = CancellationToken::new();
    token.cancel();
    let err = aggregate(&model, ThreadSelector::All, TimeFrame::unbounded(), &token).unwrap_err();
    assert_eq!(err, AnalysisError::Cancelled);
}

#[test]
fn test_concurrent_windows_over_one_model() {
    let provider = provider();
    let model = provider.shared_model();
    let expected = all(&model, TimeFrame::new(0, 250)).totals;

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let model = &model;
                scope.spawn(move || {
                    let window =
                        if i % 2 == 0 { TimeFrame::new(0, 250) } else { TimeFrame::unbounded() };
                    (i, all(model, window).totals)
                })
            })
            .collect();
        for handle in handles {
            let (i, totals) = handle.join().unwrap();
            if i % 2 == 0 {
                assert_eq!(totals, expected);
            } else {
                assert_eq!(totals.samples_inclusive, 5);
            }
        }
    });
}
