// tests/pipeline_properties.rs

mod common;
use crate::common::recording::{recording_task, Behaviour, CallLog};

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;

use assetflow::pipeline::{PipelineExecutor, PipelineNode};
use assetflow::task::{Completion, TaskRegistry};
use assetflow::types::FailurePolicy;

const TASKS: usize = 6;

fn task_name(i: usize) -> String {
    format!("task_{i}")
}

// Trees over a small fixed task pool; leaves may repeat.
fn tree_strategy() -> impl Strategy<Value = PipelineNode> {
    let leaf = (0..TASKS).prop_map(|i| PipelineNode::task(task_name(i)));
    leaf.prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(PipelineNode::Sequence),
            proptest::collection::vec(inner, 0..4).prop_map(PipelineNode::Parallel),
        ]
    })
}

fn leaf_counts(node: &PipelineNode, out: &mut BTreeMap<String, usize>) {
    match node {
        PipelineNode::Task(name) => *out.entry(name.clone()).or_default() += 1,
        PipelineNode::Sequence(children) | PipelineNode::Parallel(children) => {
            for child in children {
                leaf_counts(child, out);
            }
        }
    }
}

fn run(node: PipelineNode, failing: Option<usize>) -> (Completion, CallLog) {
    let log = CallLog::new();
    let mut registry = TaskRegistry::new();
    for i in 0..TASKS {
        let behaviour = if Some(i) == failing {
            Behaviour::failing()
        } else {
            Behaviour::ok()
        };
        registry
            .register_task(recording_task(&log, &task_name(i), behaviour))
            .unwrap();
    }
    let exec = Arc::new(PipelineExecutor::new(
        Arc::new(registry),
        FailurePolicy::WaitForAll,
    ));

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let completion = rt.block_on(exec.execute(node));
    (completion, log)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// With no failures every leaf runs exactly once per occurrence.
    #[test]
    fn successful_trees_run_every_leaf(tree in tree_strategy()) {
        let mut expected = BTreeMap::new();
        leaf_counts(&tree, &mut expected);

        let (completion, log) = run(tree, None);
        prop_assert_eq!(completion, Completion::Success);

        let mut actual: BTreeMap<String, usize> = BTreeMap::new();
        for name in log.started() {
            *actual.entry(name).or_default() += 1;
        }
        prop_assert_eq!(actual, expected);
    }

    /// A flat sequence with a failing member runs exactly the prefix up to
    /// and including the failure, and reports that member.
    #[test]
    fn flat_sequence_stops_at_failure(
        order in proptest::collection::vec(0..TASKS, 1..8),
        fail_at in 0usize..8,
    ) {
        let fail_at = fail_at % order.len();
        let failing = order[fail_at];
        let first_failure = order.iter().position(|&i| i == failing).unwrap();

        let tree = PipelineNode::Sequence(
            order.iter().map(|&i| PipelineNode::task(task_name(i))).collect(),
        );
        let (completion, log) = run(tree, Some(failing));

        let expected: Vec<String> = order[..=first_failure]
            .iter()
            .map(|&i| task_name(i))
            .collect();
        prop_assert_eq!(log.started(), expected);
        prop_assert_eq!(completion.failure().map(|f| f.task.clone()), Some(task_name(failing)));
    }

    /// Under wait-for-all a parallel group starts every child regardless of
    /// failures.
    #[test]
    fn parallel_wait_for_all_starts_every_child(
        children in proptest::collection::btree_set(0..TASKS, 1..TASKS),
        failing in 0..TASKS,
    ) {
        let tree = PipelineNode::Parallel(
            children.iter().map(|&i| PipelineNode::task(task_name(i))).collect(),
        );
        let (completion, log) = run(tree, Some(failing));

        let mut started = log.started();
        started.sort();
        let expected: Vec<String> = children.iter().map(|&i| task_name(i)).collect();
        prop_assert_eq!(started, expected);
        prop_assert_eq!(completion.is_success(), !children.contains(&failing));
    }
}
