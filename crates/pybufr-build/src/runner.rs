//! External tool invocation.
//!
//! Tools are judged by the files they leave behind, not by their exit
//! status: a non-zero exit is logged and the caller checks for the expected
//! artifact. Invocations block until the tool exits; there is no timeout.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use log::{info, warn};

use crate::error::{InstallError, InstallResult};

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Executable name or path.
    pub program: String,
    /// Arguments, passed verbatim (no shell expansion).
    pub args: Vec<String>,
    /// Working directory.
    pub cwd: PathBuf,
}

impl ToolCommand {
    /// Creates a new command running in `cwd`.
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends a path argument.
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cd {}; {}", self.cwd.display(), self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Outcome of a finished command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Whether the tool exited successfully.
    pub success: bool,
    /// Exit code, if the tool was not killed by a signal.
    pub code: Option<i32>,
}

impl From<ExitStatus> for ToolOutcome {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

/// Runs external commands.
pub trait CommandRunner {
    /// Runs `command` to completion.
    ///
    /// Only a failure to start the tool is an error.
    fn run(&self, command: &ToolCommand) -> InstallResult<ToolOutcome>;
}

/// Runner that spawns real subprocesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    /// Discard the tool's stdout/stderr instead of passing them through.
    pub quiet: bool,
}

impl SystemRunner {
    /// Creates a runner whose tool output goes to the terminal.
    pub fn new() -> Self {
        Self { quiet: false }
    }

    /// Creates a runner that discards tool output.
    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> InstallResult<ToolOutcome> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.cwd)
            .stdin(Stdio::null());

        if self.quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let status = cmd.status().map_err(|e| InstallError::SpawnFailed {
            program: command.program.clone(),
            source: e,
        })?;
        Ok(status.into())
    }
}

/// Narrates and runs a command, warning on a non-zero exit.
pub fn execute(runner: &dyn CommandRunner, command: &ToolCommand) -> InstallResult<ToolOutcome> {
    info!("Executing command: {}", command);
    let outcome = runner.run(command)?;
    if !outcome.success {
        match outcome.code {
            Some(code) => warn!("{} exited with status {}", command.program, code),
            None => warn!("{} was terminated by a signal", command.program),
        }
    }
    Ok(outcome)
}
