use coreprof::analysis::{aggregate, CancellationToken};
use coreprof::domain::{FunctionId, ThreadId, ThreadSelector, TimeFrame};
use coreprof::profiling::{load_trace, TraceModel};
use coreprof::stacks::NodeIndex;
use coreprof::AnalysisConfig;
use std::io::Cursor;

const GROW: &str = "thr crt 0x1 0x0\nsam str 0x1 100 1 0:1 0x10\nsam str 0x1 200 1 1:2 0x20\n";
const UNWIND: &str = "sam str 0x1 300 1 0:1 0x30\n";

fn load(trace: &str) -> TraceModel {
    load_trace(Cursor::new(trace), AnalysisConfig::default()).unwrap()
}

fn resolved_stacks(model: &TraceModel, thread: ThreadId) -> Vec<Vec<FunctionId>> {
    let data = model.thread(thread).unwrap();
    data.samples.iter().map(|s| data.tree().stack(s.top)).collect()
}

#[test]
fn test_growing_stack_builds_a_chain() {
    let model = load(GROW);
    let tree = model.thread(ThreadId(1)).unwrap().tree();

    let root = tree.node(NodeIndex::ROOT);
    assert_eq!(root.children.len(), 1);
    let outer = root.children[0];
    assert_eq!(tree.node(outer).function_id, FunctionId(0x10));
    assert_eq!(tree.node(outer).children.len(), 1);
    assert_eq!(tree.node(tree.node(outer).children[0]).function_id, FunctionId(0x20));

    assert_eq!(
        resolved_stacks(&model, ThreadId(1)),
        vec![vec![FunctionId(0x10)], vec![FunctionId(0x10), FunctionId(0x20)]]
    );

    let stats =
        aggregate(&model, ThreadSelector::All, TimeFrame::unbounded(), &CancellationToken::new())
            .unwrap();
    let outer = stats.function(FunctionId(0x10));
    let inner = stats.function(FunctionId(0x20));
    assert_eq!((outer.samples_exclusive, outer.samples_inclusive), (1, 2));
    assert_eq!((inner.samples_exclusive, inner.samples_inclusive), (1, 1));
}

#[test]
fn test_zero_prefix_unwinds_to_root() {
    let model = load(&format!("{GROW}{UNWIND}"));
    assert_eq!(resolved_stacks(&model, ThreadId(1))[2], vec![FunctionId(0x30)]);

    let tree = model.thread(ThreadId(1)).unwrap().tree();
    assert_eq!(tree.node(NodeIndex::ROOT).children.len(), 2);

    let stats =
        aggregate(&model, ThreadSelector::All, TimeFrame::unbounded(), &CancellationToken::new())
            .unwrap();
    assert_eq!(stats.function(FunctionId(0x10)).samples_inclusive, 2);
    let unwound = stats.function(FunctionId(0x30));
    assert_eq!((unwound.samples_exclusive, unwound.samples_inclusive), (1, 1));
}

#[test]
fn test_recursion_keeps_one_node_per_position() {
    let model = load("sam str 0x1 100 1 0:3 0x10 0x10 0x10\nsam str 0x1 200 1 2:2\n");
    let data = model.thread(ThreadId(1)).unwrap();

    // Root plus three nested nodes for the same function
    assert_eq!(data.tree().len(), 4);
    let depths: Vec<u32> = data.samples.iter().map(|s| data.tree().node(s.top).depth).collect();
    assert_eq!(depths, vec![3, 2]);
}

#[test]
fn test_same_trace_builds_identical_trees() {
    let trace = format!(
        "{GROW}{UNWIND}sam str 0x1 400 1 1:3 0x40 0x50\nsam str 0x2 400 1 0:1 0x10\n"
    );
    let first = load(&trace);
    let second = load(&trace);

    let shape = |model: &TraceModel, thread: ThreadId| -> Vec<_> {
        let tree = model.thread(thread).unwrap().tree();
        tree.iter().map(|(index, node)| (index, node.function_id, node.parent)).collect()
    };
    for thread in [ThreadId(1), ThreadId(2)] {
        assert_eq!(shape(&first, thread), shape(&second, thread));
    }
}

#[test]
fn test_desynced_sample_is_dropped_and_stack_kept() {
    let model = load(
        "sam str 0x1 100 1 0:1 0x10\nsam str 0x1 200 1 4:5 0x20\nsam str 0x1 300 1 1:2 0x30\n",
    );

    assert_eq!(model.diagnostics.dropped_samples, 1);
    assert!(!model.diagnostics.is_complete());
    assert_eq!(
        resolved_stacks(&model, ThreadId(1)),
        vec![vec![FunctionId(0x10)], vec![FunctionId(0x10), FunctionId(0x30)]]
    );
}

#[test]
fn test_threads_have_independent_trees() {
    let model = load(
        "sam str 0x1 100 1 0:1 0x10\nsam str 0x2 100 1 0:1 0x20\nsam str 0x1 200 1 1:2 0x30\n",
    );
    assert_eq!(resolved_stacks(&model, ThreadId(1))[1], vec![FunctionId(0x10), FunctionId(0x30)]);
    assert_eq!(resolved_stacks(&model, ThreadId(2)), vec![vec![FunctionId(0x20)]]);
}
