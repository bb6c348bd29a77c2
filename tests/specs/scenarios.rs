//! The six concrete scenarios from `spec.md` §8, exercised against the
//! public API of `kiln-core`/`kiln-storage`/`kiln-engine`/`kiln-adapters`.

use crate::prelude::{fake_fs, fresh_registry_root};
use kiln_adapters::{c_compile_step, c_link_step, invalidate_if_needed, CProject};
use kiln_core::Filesystem;
use kiln_engine::{build, BuildManager, Step, StepRegistry};
use std::path::PathBuf;
use std::sync::Arc;

/// Scenario 1: header change propagation. `src/a.c` includes `h/a.h`,
/// which includes `h/b.h`. Touching `h/b.h` must mark both the compile of
/// `a.c` and the link that depends on it stale, with the compile
/// preceding the link in `to_update`.
#[tokio::test]
async fn header_change_propagates_through_the_include_chain_to_the_link() {
    let (_dir, root_ns) = fresh_registry_root();
    let registry = StepRegistry::new(root_ns);
    let fs = fake_fs();
    fs.set_file("/proj/src/a.c", "#include \"h/a.h\"\nint main(void) {}\n", "1");
    fs.set_file("/proj/h/a.h", "#include \"h/b.h\"\n", "1");
    fs.set_file("/proj/h/b.h", "void b(void);\n", "1");
    let fs_dyn: Arc<dyn Filesystem> = fs.clone();

    let project = Arc::new(CProject::new("/proj"));
    let compile = registry.intern(c_compile_step(
        &registry,
        Arc::clone(&project),
        Arc::clone(&fs_dyn),
        "/proj/src/a.c",
        "/proj/a.o",
        "true",
        vec![],
        vec![],
    ));
    let link = registry.intern(c_link_step(
        Arc::clone(&fs_dyn),
        vec![PathBuf::from("/proj/a.o")],
        "/proj/app",
        "true",
        vec![Arc::clone(&compile)],
        vec![],
    ));

    build(Arc::clone(&link)).await.expect("first build");

    fs.touch("/proj/h/b.h", "2");

    let manager = BuildManager::new(Arc::clone(&link));
    let to_update = manager.make_update_list();
    let ids: Vec<String> = to_update.iter().map(|s| s.step_id()).collect();

    assert!(ids.contains(&compile.step_id()), "compile of a.c must be marked stale");
    assert_eq!(ids.last(), Some(&link.step_id()), "link must come last, after its stale dependency");
    let compile_index = ids.iter().position(|id| *id == compile.step_id()).expect("present");
    let link_index = ids.len() - 1;
    assert!(compile_index < link_index, "compile must precede link in to_update");

    manager.build().await.expect("second build");
}

/// Scenario 2: dedup. Two compile steps that both include the same
/// header end up depending on the exact same `CDependencyStep` instance,
/// which `to_update` lists once.
#[tokio::test]
async fn two_compiles_sharing_a_header_dedupe_to_one_dependency_step() {
    let (_dir, root_ns) = fresh_registry_root();
    let registry = StepRegistry::new(root_ns);
    let fs = fake_fs();
    fs.set_file("/proj/src/a.c", "#include \"h/common.h\"\n", "1");
    fs.set_file("/proj/src/b.c", "#include \"h/common.h\"\n", "1");
    fs.set_file("/proj/h/common.h", "void common(void);\n", "1");
    let fs_dyn: Arc<dyn Filesystem> = fs.clone();

    let project = Arc::new(CProject::new("/proj"));
    let a = registry.intern(c_compile_step(
        &registry,
        Arc::clone(&project),
        Arc::clone(&fs_dyn),
        "/proj/src/a.c",
        "/proj/a.o",
        "true",
        vec![],
        vec![],
    ));
    let b = registry.intern(c_compile_step(
        &registry,
        Arc::clone(&project),
        Arc::clone(&fs_dyn),
        "/proj/src/b.c",
        "/proj/b.o",
        "true",
        vec![],
        vec![],
    ));

    let a_common = Arc::clone(&a.dependencies()[0]);
    let b_common = Arc::clone(&b.dependencies()[0]);
    assert!(Arc::ptr_eq(&a_common, &b_common));

    let link = registry.intern(c_link_step(
        fs_dyn,
        vec![PathBuf::from("/proj/a.o"), PathBuf::from("/proj/b.o")],
        "/proj/app",
        "true",
        vec![Arc::clone(&a), Arc::clone(&b)],
        vec![],
    ));

    let manager = BuildManager::new(link);
    let to_update = manager.make_update_list();
    let common_count = to_update.iter().filter(|s| Arc::ptr_eq(s, &a_common)).count();
    assert_eq!(common_count, 1);
}

/// Scenario 3: failure replay. A step whose `run` fails has its message
/// replayed verbatim on the next invocation, without `run` being invoked
/// again.
#[tokio::test]
async fn a_failing_step_replays_its_message_without_rerunning() {
    let (_dir, root_ns) = fresh_registry_root();
    let registry = StepRegistry::new(root_ns);
    let (step, handle) = kiln_engine::test_support::scripted_step("flaky", vec![]);
    let step = registry.intern(step);
    handle.set_should_fail(true);

    let first = build(Arc::clone(&step)).await;
    assert!(first.is_err());
    assert_eq!(handle.run_count(), 1);

    let second = build(step).await;
    assert_eq!(handle.run_count(), 1, "run must not be invoked again");
    match second.unwrap_err() {
        kiln_engine::BuildError::StepFailed { message, .. } => {
            assert!(message.contains("boom"), "cached failure message must be replayed verbatim")
        }
        other => panic!("expected StepFailed, got {other:?}"),
    }
}

/// Scenario 4: the scanner only matches `#include`s that are live code --
/// not ones inside a block comment's trailing text, a line comment, or a
/// string literal -- while still matching one that follows a closed block
/// comment on the same line.
#[test]
fn scanner_matches_only_live_includes_on_a_mixed_line_set() {
    let source = "/* a */ #include \"x.h\"\n// #include \"y.h\"\n\"s\" #include \"z.h\"\n#include <q.h>";
    let zones = vec![
        kiln_core::scan::ExcludedZoneSpec::new("/*", "*/", false, true).expect("zone"),
        kiln_core::scan::ExcludedZoneSpec::new("//", "\n", false, true).expect("zone"),
        kiln_core::scan::ExcludedZoneSpec::new("\"", "\"", true, false).expect("zone"),
    ];
    let matcher = regex::Regex::new(r#"#include ((?:<[^>]+>)|(?:"[^"]+"))"#).expect("pattern");

    let matches = kiln_core::scan::find_matches(source, &zones, &matcher, true);
    let captured: Vec<&str> = matches.iter().filter_map(|m| m.group(1)).collect();

    assert_eq!(captured, vec!["\"x.h\"", "<q.h>"]);
}

/// Scenario 5: a changed build script drops every persisted step and
/// forces a from-scratch rebuild on the next invocation.
#[test]
fn a_changed_build_script_drops_the_steps_namespace() {
    let (_dir, root_ns) = fresh_registry_root();
    let fs = fake_fs();
    fs.set_file("/proj/build.rs", "mod steps;\n", "1");
    fs.set_file("/proj/steps.rs", "", "1");
    let fs_dyn: Arc<dyn Filesystem> = fs.clone();

    invalidate_if_needed(&root_ns, &PathBuf::from("/proj/build.rs"), &PathBuf::from("/proj"), fs_dyn.as_ref())
        .expect("first invalidation always reports a change");

    let steps_ns = root_ns.sub("steps");
    steps_ns.set("some_step|last_time_input_version", "1").expect("seed");

    fs.touch("/proj/build.rs", "2");
    let changed = invalidate_if_needed(&root_ns, &PathBuf::from("/proj/build.rs"), &PathBuf::from("/proj"), fs_dyn.as_ref())
        .expect("second invalidation");

    assert!(changed);
    let survived: Option<String> = steps_ns.get("some_step|last_time_input_version");
    assert!(survived.is_none());
}

/// Scenario 6: include resolution precedence. A file's own directory
/// wins over every configured include path, which in turn are tried in
/// configured order.
#[test]
fn include_resolution_prefers_own_directory_over_configured_include_paths_in_order() {
    let fs = fake_fs();
    fs.set_file("/proj/src/foo.h", "", "1");
    fs.set_file("/proj/A/foo.h", "", "1");
    fs.set_file("/proj/B/foo.h", "", "1");

    let project = CProject::new("/proj").with_include_paths(vec![PathBuf::from("/proj/A"), PathBuf::from("/proj/B")]);

    let resolved = project.resolve_include(&PathBuf::from("/proj/src/a.c"), "foo.h", fs.as_ref());
    assert_eq!(resolved, Some(PathBuf::from("/proj/src/foo.h")));

    let project_no_own_dir = CProject::new("/proj").with_include_paths(vec![PathBuf::from("/proj/A"), PathBuf::from("/proj/B")]);
    let resolved = project_no_own_dir.resolve_include(&PathBuf::from("/proj/other/a.c"), "foo.h", fs.as_ref());
    assert_eq!(resolved, Some(PathBuf::from("/proj/A/foo.h")));
}
