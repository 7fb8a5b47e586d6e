//! Subprocess execution
//!
//! Backends never spawn processes directly; they go through a
//! [`CommandRunner`] so the command lines they build can be checked without
//! the replay tools installed.

use std::io;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{BackendError, Result};

/// What happens to a child's stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrMode {
    /// Forwarded to our own stderr
    Inherit,
    Discard,
}

/// Exit status and captured stdout of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Runs a command line to completion.
pub trait CommandRunner: Send + Sync {
    fn run(&self, cmd: &[String], stderr: StderrMode) -> io::Result<CommandOutput>;
}

/// Spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &[String], stderr: StderrMode) -> io::Result<CommandOutput> {
        let (program, args) = cmd
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;

        let stderr = match stderr {
            StderrMode::Inherit => Stdio::inherit(),
            StderrMode::Discard => Stdio::null(),
        };
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(stderr)
            .output()?;

        Ok(CommandOutput { code: output.status.code(), stdout: output.stdout })
    }
}

pub(crate) fn command_line(cmd: &[String]) -> String {
    cmd.join(" ")
}

/// Run a command, returning its output whatever the exit status.
pub(crate) fn run_captured(
    runner: &dyn CommandRunner,
    cmd: &[String],
    stderr: StderrMode,
) -> Result<CommandOutput> {
    debug!("Running {}", command_line(cmd));
    runner
        .run(cmd, stderr)
        .map_err(|source| BackendError::Spawn { command: command_line(cmd), source })
}

/// Run a command, echo it with its stdout under `[tag]`, and fail on a
/// non-zero exit.
pub(crate) fn run_logged(
    runner: &dyn CommandRunner,
    tag: &str,
    cmd: &[String],
    stderr: StderrMode,
) -> Result<CommandOutput> {
    let output = run_captured(runner, cmd, stderr)?;
    println!("[{tag}] Running: {}\n{}", command_line(cmd), output.stdout_lossy());

    if !output.success() {
        let code = output.code.unwrap_or(-1);
        println!("[{tag}] Process failed with error code: {code}");
        return Err(BackendError::CommandFailed { command: command_line(cmd), code });
    }
    Ok(output)
}
