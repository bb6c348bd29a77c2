//! The four invariants from `spec.md` §8.

use crate::prelude::fresh_registry_root;
use kiln_engine::test_support::scripted_step;
use kiln_engine::{build, BuildManager, Step, StepRegistry};
use std::sync::Arc;

/// After a successful run, `last_time_input_version == input_version` as
/// observed at the moment the run started.
#[tokio::test]
async fn successful_run_persists_the_input_version_it_started_with() {
    let (_dir, root_ns) = fresh_registry_root();
    let registry = StepRegistry::new(root_ns);
    let (step, _handle) = scripted_step("a", vec![]);
    let step = registry.intern(step);

    let version_at_start = step.input_version();
    build(Arc::clone(&step)).await.expect("build succeeds");

    assert_eq!(step.state().last_time_input_version(), version_at_start);
}

/// Two constructions with identical `step_id` return the exact same
/// object: same identity, same `dependencies` list.
#[test]
fn constructions_with_identical_step_id_are_identical_objects() {
    let (_dir, root_ns) = fresh_registry_root();
    let registry = StepRegistry::new(root_ns);
    let (child, _) = scripted_step("child", vec![]);
    let child = registry.intern(child);

    let (a1, _) = scripted_step("shared", vec![Arc::clone(&child)]);
    let (a2, _) = scripted_step("shared", vec![]);

    let first = registry.intern(a1);
    let second = registry.intern(a2);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.dependencies().len(), second.dependencies().len());
}

/// Each step appears in `to_update` at most once, and whenever it is
/// present, every stale dependency of it precedes it.
#[tokio::test]
async fn to_update_contains_no_duplicates_and_respects_dependency_order() {
    let (_dir, root_ns) = fresh_registry_root();
    let registry = StepRegistry::new(root_ns);
    let (common, _) = scripted_step("common", vec![]);
    let common = registry.intern(common);
    let (a, _) = scripted_step("a", vec![Arc::clone(&common)]);
    let a = registry.intern(a);
    let (b, _) = scripted_step("b", vec![Arc::clone(&common)]);
    let b = registry.intern(b);
    let (top, _) = scripted_step("top", vec![a, b]);
    let top = registry.intern(top);

    let manager = BuildManager::new(top);
    let to_update = manager.make_update_list();

    let ids: Vec<String> = to_update.iter().map(|s| s.step_id()).collect();
    let unique: std::collections::HashSet<&String> = ids.iter().collect();
    assert_eq!(ids.len(), unique.len(), "no step may appear twice");

    let common_index = ids.iter().position(|id| id == "common").unwrap();
    let a_index = ids.iter().position(|id| id == "a").unwrap();
    let b_index = ids.iter().position(|id| id == "b").unwrap();
    let top_index = ids.iter().position(|id| id == "top").unwrap();
    assert!(common_index < a_index && common_index < b_index && a_index < top_index && b_index < top_index);
}

/// After invalidation, the `steps` namespace is empty: every previously
/// persisted key is gone.
#[test]
fn invalidation_leaves_the_steps_namespace_empty() {
    let (_dir, root_ns) = fresh_registry_root();
    let fs = crate::prelude::fake_fs();
    fs.set_file("/proj/build.rs", "", "1");

    kiln_adapters::invalidate_if_needed(
        &root_ns,
        &std::path::PathBuf::from("/proj/build.rs"),
        &std::path::PathBuf::from("/proj"),
        fs.as_ref(),
    )
    .expect("first invalidation");

    let steps_ns = root_ns.sub("steps");
    steps_ns.set("some_step|has_failed", true).expect("seed");

    fs.touch("/proj/build.rs", "2");
    kiln_adapters::invalidate_if_needed(
        &root_ns,
        &std::path::PathBuf::from("/proj/build.rs"),
        &std::path::PathBuf::from("/proj"),
        fs.as_ref(),
    )
    .expect("second invalidation");

    let survived: Option<bool> = steps_ns.get("some_step|has_failed");
    assert!(survived.is_none());
}
