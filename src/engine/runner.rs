//! Spawning of external commands.
//!
//! The pipeline only ever describes commands as `ExternalCommand` values and hands
//! them to a `CommandRunner`, so the real process spawning can be swapped out.

use crate::error::{AppError, Result};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, trace};

/// A program invocation: binary, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Builds the `std::process::Command` for this invocation.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Executes external commands, blocking until they exit.
pub trait CommandRunner {
    /// Runs the command with the terminal attached. A non-zero exit is an error.
    fn run(&self, cmd: &ExternalCommand) -> Result<()>;

    /// Runs the command with all output discarded and reports whether it succeeded.
    /// Failing to spawn counts as failure.
    fn probe(&self, cmd: &ExternalCommand) -> bool;
}

/// Spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ExternalCommand) -> Result<()> {
        debug!("exec: {}", cmd);
        let status = cmd
            .to_command()
            .status()
            .map_err(|e| spawn_error(cmd, e))?;

        if status.success() {
            return Ok(());
        }
        Err(AppError::CommandFailed {
            command: cmd.to_string(),
            code: status.code(),
        })
    }

    fn probe(&self, cmd: &ExternalCommand) -> bool {
        trace!("probe: {}", cmd);
        cmd.to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

fn spawn_error(cmd: &ExternalCommand, err: io::Error) -> AppError {
    if err.kind() == io::ErrorKind::NotFound {
        AppError::ToolNotFound {
            program: cmd.program().to_string(),
        }
    } else {
        AppError::from(err)
    }
}
