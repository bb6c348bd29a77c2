//! `ExecStep`: a concrete `Step` variant wrapping a subprocess invocation.
//!
//! A structural port of `original_source/pysbs/misc/exec_step.py`'s
//! `ExecBuildStep`: the `ESC_*` colour codes, `BEST_LINE_WIDTH` argument
//! wrapping, the `FORMATTERS` table, and the `step_id`/`input_version`
//! formulas (`"BuildExecStep " + json([command, *args])`, `json([mtime(f)
//! for f in input_files])`). The concurrent stdout/stderr drain has no
//! literal precedent in the retrieval pack; it is designed fresh in the
//! idiom of `oddjobs`' tracing-wrapped async execution, using
//! `tokio::join!` over two `AsyncBufReadExt::lines()` readers so a chatty
//! stderr cannot stall a full stdout pipe (`spec.md` §4.6/§5).

use crate::error::StepRunError;
use crate::step::{Step, StepState};
use async_trait::async_trait;
use kiln_core::Filesystem;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

const ESC_GRAY: &str = "\x1b[90m";
const ESC_RESET: &str = "\x1b[0m";
const ESC_BOLD: &str = "\x1b[1m";
const ESC_RED: &str = "\x1b[91m";
const ESC_BLUE: &str = "\x1b[94m";
const ESC_CYAN: &str = "\x1b[96m";
const ESC_UNDERLINE: &str = "\x1b[4m";

const BEST_LINE_WIDTH: usize = 120;

/// How a command-line argument should be highlighted when the command
/// banner is printed. Purely cosmetic; never affects identity/execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgFormat {
    /// Not highlighted.
    Normal,
    /// Highlighted as a filesystem path.
    Path,
    /// A C compiler flag, like `-Wall`; the first two characters are
    /// highlighted distinctly.
    CFlag,
    /// A C include path, like `-I/usr/include`.
    Include,
}

impl ArgFormat {
    fn render(self, value: &str) -> String {
        match self {
            ArgFormat::Normal => value.to_string(),
            ArgFormat::Path => format!("{ESC_BLUE}{ESC_UNDERLINE}{value}{ESC_RESET}"),
            ArgFormat::CFlag => {
                let (head, tail) = split_at_char_boundary(value, 2);
                format!("{ESC_CYAN}{head}{ESC_RESET}{tail}")
            }
            ArgFormat::Include => {
                let (head, tail) = split_at_char_boundary(value, 2);
                format!("{ESC_CYAN}{head}{ESC_RESET}{ESC_BLUE}{ESC_UNDERLINE}{tail}{ESC_RESET}")
            }
        }
    }
}

fn split_at_char_boundary(value: &str, n: usize) -> (&str, &str) {
    match value.char_indices().nth(n) {
        Some((idx, _)) => value.split_at(idx),
        None => (value, ""),
    }
}

/// An argument to an [`ExecStep`]'s command, tagged with how it should be
/// highlighted when the command banner is printed.
#[derive(Debug, Clone)]
pub struct ExecArgument {
    pub value: String,
    pub fmt: ArgFormat,
}

impl ExecArgument {
    pub fn new(value: impl Into<String>, fmt: ArgFormat) -> Self {
        Self {
            value: value.into(),
            fmt,
        }
    }

    pub fn normal(value: impl Into<String>) -> Self {
        Self::new(value, ArgFormat::Normal)
    }

    pub fn path(value: impl Into<String>) -> Self {
        Self::new(value, ArgFormat::Path)
    }

    pub fn cflag(value: impl Into<String>) -> Self {
        Self::new(value, ArgFormat::CFlag)
    }

    pub fn include(value: impl Into<String>) -> Self {
        Self::new(value, ArgFormat::Include)
    }
}

impl std::fmt::Display for ExecArgument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// A `Step` that runs a subprocess. Its identity and input version are
/// derived from its command, argument vector, and declared input files --
/// it does not inspect the subprocess's actual behaviour to decide
/// whether it is stale.
pub struct ExecStep {
    state: StepState,
    filesystem: Arc<dyn Filesystem>,
    command: String,
    args: Vec<ExecArgument>,
    input_files: Vec<PathBuf>,
}

impl ExecStep {
    pub fn new(
        filesystem: Arc<dyn Filesystem>,
        command: impl Into<String>,
        dependencies: Vec<Arc<dyn Step>>,
        args: Vec<ExecArgument>,
        input_files: Vec<PathBuf>,
    ) -> Self {
        Self {
            state: StepState::with_dependencies(dependencies),
            filesystem,
            command: command.into(),
            args,
            input_files,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[ExecArgument] {
        &self.args
    }

    pub fn input_files(&self) -> &[PathBuf] {
        &self.input_files
    }

    fn print_command(&self) {
        self.state
            .print(&format!("{ESC_GRAY} $ {ESC_RESET}{ESC_BOLD}{}{ESC_RESET}", self.command));

        let mut lines = vec![String::from(" :   ")];
        let mut line_w = 0usize;

        for arg in &self.args {
            let rendered = arg.fmt.render(&arg.value);
            if line_w + 1 + arg.value.len() > BEST_LINE_WIDTH {
                lines.push(String::from(" :   "));
                line_w = 0;
            }
            // Allow expect here: `lines` is seeded with one entry above and
            // only ever pushed to, never emptied.
            #[allow(clippy::expect_used)]
            let last = lines.last_mut().expect("at least one line");
            last.push_str(&rendered);
            last.push(' ');
            line_w += arg.value.len() + 1;
        }

        for line in &lines {
            self.state.print(line);
        }
    }
}

#[async_trait]
impl Step for ExecStep {
    fn state(&self) -> &StepState {
        &self.state
    }

    fn step_id(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.command.clone());
        parts.extend(self.args.iter().map(ExecArgument::to_string));
        format!(
            "BuildExecStep {}",
            serde_json::to_string(&parts).unwrap_or_default()
        )
    }

    fn input_version(&self) -> String {
        let versions: Vec<String> = self
            .input_files
            .iter()
            .map(|f| self.filesystem.mtime_token(f).unwrap_or_default())
            .collect();
        serde_json::to_string(&versions).unwrap_or_default()
    }

    async fn run(&self) -> Result<(), StepRunError> {
        self.print_command();

        let mut command = Command::new(&self.command);
        command.args(self.args.iter().map(|a| a.value.clone()));
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| StepRunError::Failed(format!("failed to spawn `{}`: {e}", self.command)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StepRunError::Failed(format!("`{}` spawned without a stdout pipe", self.command)))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| StepRunError::Failed(format!("`{}` spawned without a stderr pipe", self.command)))?;

        let drain_stdout = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                self.state.print(&line);
            }
        };
        let drain_stderr = async {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                self.state.print(&line);
            }
        };

        let (_, _, wait_result) = tokio::join!(drain_stdout, drain_stderr, child.wait());
        let status = wait_result
            .map_err(|e| StepRunError::Failed(format!("failed to wait on `{}`: {e}", self.command)))?;

        self.state.print("");

        if !status.success() {
            self.state.print(&format!(
                "{ESC_RED}Process returned exit code {:?}, build failed{ESC_RESET}",
                status.code()
            ));
            self.state.fail()?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "exec_step_tests.rs"]
mod tests;
