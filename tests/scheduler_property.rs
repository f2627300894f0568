// tests/scheduler_property.rs

use std::collections::{BTreeSet, HashSet, VecDeque};

use proptest::prelude::*;

use assetdag::config::ConfigFile;
use assetdag::dag::Scheduler;
use assetdag::engine::TaskOutcome;
use assetdag::types::{FailureKind, OnError, TaskKind};
use assetdag_test_utils::builders::{ConfigFileBuilder, PipelineBuilder, TaskConfigBuilder};

/// A pipeline of parallel groups run in series: every task of group `g`
/// depends on every task of group `g - 1`.
fn layered_config(
    groups: &[usize],
    tolerant: &BTreeSet<usize>,
) -> (ConfigFile, Vec<Vec<String>>) {
    let mut builder = ConfigFileBuilder::new();
    let mut pipeline = PipelineBuilder::new();
    let mut layers = Vec::new();
    let mut index = 0;

    for &size in groups {
        let mut names = Vec::new();
        for _ in 0..size {
            let name = format!("task_{index}");
            let on_error = if tolerant.contains(&index) {
                OnError::Continue
            } else {
                OnError::Fail
            };
            let task = TaskConfigBuilder::new(TaskKind::Copy)
                .src(&format!("src/{name}/*"))
                .dest(&format!("dist/{name}"))
                .on_error(on_error)
                .build();
            builder = builder.with_task(&name, task);
            names.push(name);
            index += 1;
        }
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        pipeline = pipeline.parallel(&refs);
        layers.push(names);
    }

    (builder.with_pipeline("p", pipeline.build()).build(), layers)
}

proptest! {
    #[test]
    fn build_pass_terminates_and_respects_ordering(
        groups in proptest::collection::vec(1..4usize, 1..5),
        failing in proptest::collection::btree_set(0..16usize, 0..4),
        tolerant in proptest::collection::btree_set(0..16usize, 0..4),
    ) {
        let (cfg, layers) = layered_config(&groups, &tolerant);
        let pipeline = cfg.pipeline("p").unwrap().clone();
        let mut scheduler = Scheduler::new(&pipeline, &cfg.tasks).unwrap();
        prop_assert_eq!(scheduler.task_names().count(), groups.iter().sum::<usize>());

        let index_of = |name: &str| -> usize {
            name.trim_start_matches("task_").parse().unwrap()
        };

        scheduler.start_new_run();
        let mut executing: VecDeque<String> =
            scheduler.handle_full_run().into_iter().map(|t| t.name).collect();
        let mut dispatched = HashSet::new();
        let mut completed = HashSet::new();
        let mut blocking = HashSet::new();

        while let Some(task) = executing.pop_front() {
            for dep in pipeline.dependencies_of(&task) {
                prop_assert!(completed.contains(&dep), "{task} ran before {dep}");
                prop_assert!(!blocking.contains(&dep), "{task} ran after failed {dep}");
            }
            prop_assert!(dispatched.insert(task.clone()), "{task} dispatched twice");

            let i = index_of(&task);
            let outcome = if failing.contains(&i) {
                if !tolerant.contains(&i) {
                    blocking.insert(task.clone());
                }
                TaskOutcome::Failed(FailureKind::Transform)
            } else {
                TaskOutcome::Success
            };
            completed.insert(task.clone());

            executing.extend(
                scheduler.handle_completion(&task, outcome).into_iter().map(|t| t.name),
            );
        }

        prop_assert!(scheduler.is_idle());

        // Anything skipped has a predecessor that failed or was skipped.
        for (g, layer) in layers.iter().enumerate() {
            for task in layer {
                if dispatched.contains(task) {
                    continue;
                }
                prop_assert!(g > 0, "{task} has no predecessors but never ran");
                let blocked = layers[g - 1]
                    .iter()
                    .any(|dep| blocking.contains(dep) || !dispatched.contains(dep));
                prop_assert!(blocked, "{task} never ran without an upstream failure");
            }
        }
    }
}
