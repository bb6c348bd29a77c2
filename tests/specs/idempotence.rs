//! The round-trip/idempotence laws from `spec.md` §8.

use crate::prelude::fresh_registry_root;
use kiln_engine::test_support::scripted_step;
use kiln_engine::{build, BuildError, BuildManager, StepRegistry};
use std::sync::Arc;

/// Running `build` twice with no input changes: the second run performs
/// zero reruns.
#[tokio::test]
async fn second_build_with_no_changes_performs_zero_reruns() {
    let (_dir, root_ns) = fresh_registry_root();
    let registry = StepRegistry::new(root_ns);
    let (step, handle) = scripted_step("a", vec![]);
    let step = registry.intern(step);

    build(Arc::clone(&step)).await.expect("first build");
    let manager = BuildManager::new(Arc::clone(&step));
    assert!(manager.make_update_list().is_empty(), "nothing should be stale");

    build(step).await.expect("second build");
    assert_eq!(handle.run_count(), 1, "second build must perform zero reruns");
}

/// Running after modifying exactly one leaf: every ancestor of that leaf
/// reruns, and nothing else does.
#[tokio::test]
async fn modifying_one_leaf_reruns_only_its_ancestors() {
    let (_dir, root_ns) = fresh_registry_root();
    let registry = StepRegistry::new(root_ns);
    let (leaf, leaf_handle) = scripted_step("leaf", vec![]);
    let leaf = registry.intern(leaf);
    let (sibling, sibling_handle) = scripted_step("sibling", vec![]);
    let sibling = registry.intern(sibling);
    let (top, top_handle) = scripted_step("top", vec![Arc::clone(&leaf), Arc::clone(&sibling)]);
    let top = registry.intern(top);

    build(Arc::clone(&top)).await.expect("first build");
    leaf_handle.set_version("2");
    build(top).await.expect("second build");

    assert_eq!(leaf_handle.run_count(), 2, "the modified leaf must rerun");
    assert_eq!(top_handle.run_count(), 2, "its ancestor must rerun");
    assert_eq!(sibling_handle.run_count(), 1, "the untouched sibling must not rerun");
}

/// Running after a prior failure without changing any inputs: the cached
/// failure is replayed and the build aborts without invoking `run`.
#[tokio::test]
async fn replaying_a_prior_failure_does_not_invoke_run_again() {
    let (_dir, root_ns) = fresh_registry_root();
    let registry = StepRegistry::new(root_ns);
    let (step, handle) = scripted_step("flaky", vec![]);
    let step = registry.intern(step);
    handle.set_should_fail(true);

    build(Arc::clone(&step)).await.expect_err("first build fails");
    assert_eq!(handle.run_count(), 1);

    let result = build(step).await;
    assert_eq!(handle.run_count(), 1, "run must not be invoked again");
    assert!(matches!(result, Err(BuildError::StepFailed { .. })));
}

/// Scanner idempotence: once a match's span is removed from the source,
/// searching the reduced source again finds nothing new.
#[test]
fn scanner_finds_nothing_new_once_matched_spans_are_removed() {
    let source = "#include \"a.h\"\n#include \"b.h\"\n";
    let zones: Vec<kiln_core::scan::ExcludedZoneSpec> = vec![];
    let matcher = regex::Regex::new(r#"#include ((?:<[^>]+>)|(?:"[^"]+"))"#).expect("pattern");

    let first = kiln_core::scan::find_matches(source, &zones, &matcher, true);
    assert_eq!(first.len(), 2);

    let mut reduced = source.to_string();
    for m in &first {
        reduced = reduced.replacen(&m.full, "", 1);
    }

    let second = kiln_core::scan::find_matches(&reduced, &zones, &matcher, true);
    assert!(second.is_empty(), "nothing new should appear once every match has been removed");
}
