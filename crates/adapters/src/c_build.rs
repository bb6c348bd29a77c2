//! Builder functions assembling [`ExecStep`]s for compiling and linking C
//! and C++ sources, with a [`CDependencyStep`] threaded in so header
//! changes propagate through the build graph.
//!
//! Grounded on `original_source/pysbs/c/compilation.py::CCompilationStep`
//! and `pysbs/c/linking.py::CLinkingStep`, a feature `spec.md`'s
//! distillation only gestures at in prose (`SPEC_FULL.md` §4.4
//! supplements it). Flags, include paths, and output path are formatted
//! the same way; `-fdiagnostics-color` is kept as the one default
//! compiler flag both step types always carry.

use crate::cdeps::CDependencyStep;
use crate::cproject::CProject;
use kiln_core::Filesystem;
use kiln_engine::{ExecArgument, ExecStep, Step, StepRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build a `g++`/`gcc`-style compilation step: `<command> <input> -o
/// <output> -I<include_path>... -c -fdiagnostics-color <flags>`.
///
/// `input`'s header dependencies are resolved through a
/// [`CDependencyStep`], interned on `registry`, and added as an implicit
/// dependency so the compile re-runs whenever a transitively included
/// header changes, in addition to any `dependencies` the caller supplies.
#[allow(clippy::too_many_arguments)]
pub fn c_compile_step(
    registry: &StepRegistry,
    project: Arc<CProject>,
    filesystem: Arc<dyn Filesystem>,
    input: impl Into<PathBuf>,
    output: impl Into<PathBuf>,
    command: impl Into<String>,
    mut dependencies: Vec<Arc<dyn Step>>,
    extra_flags: Vec<ExecArgument>,
) -> ExecStep {
    let input = input.into();
    let output = output.into();

    let include_deps = registry.intern(CDependencyStep::new(
        Arc::clone(&project),
        input.clone(),
        Arc::clone(&filesystem),
    ));
    dependencies.push(include_deps);

    let mut args = vec![ExecArgument::path(path_to_string(&input)), ExecArgument::normal("-o")];
    args.push(ExecArgument::path(path_to_string(&output)));
    args.extend(
        project
            .include_paths
            .iter()
            .map(|p| ExecArgument::include(format!("-I{}", path_to_string(p)))),
    );
    args.push(ExecArgument::normal("-c"));
    args.push(ExecArgument::cflag("-fdiagnostics-color"));
    args.extend(extra_flags);

    ExecStep::new(filesystem, command, dependencies, args, vec![input])
}

/// Build a `g++`/`gcc`-style linking step: `<command> <input>... -o
/// <output> -fdiagnostics-color <flags>`.
pub fn c_link_step(
    filesystem: Arc<dyn Filesystem>,
    inputs: Vec<PathBuf>,
    output: impl Into<PathBuf>,
    command: impl Into<String>,
    dependencies: Vec<Arc<dyn Step>>,
    extra_flags: Vec<ExecArgument>,
) -> ExecStep {
    let output = output.into();

    let mut args: Vec<ExecArgument> = inputs.iter().map(|p| ExecArgument::path(path_to_string(p))).collect();
    args.push(ExecArgument::normal("-o"));
    args.push(ExecArgument::path(path_to_string(&output)));
    args.push(ExecArgument::cflag("-fdiagnostics-color"));
    args.extend(extra_flags);

    ExecStep::new(filesystem, command, dependencies, args, inputs)
}

fn path_to_string(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
#[path = "c_build_tests.rs"]
mod tests;
