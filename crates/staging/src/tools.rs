//! External tool invocation
//!
//! Every external program (filesystem creator, tuner, container runtime)
//! goes through a [`ToolRunner`]. Invocations are argument lists; the
//! rendered string form is for logs and messages only.

use crate::error::{StagingError, StagingResult};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// One external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    program: String,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    inherit_output: bool,
}

impl ToolInvocation {
    /// Invocation of `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            inherit_output: false,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Run in `dir` instead of the current directory
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Pass the tool's stdout and stderr through instead of capturing them
    pub fn inherit_output(mut self) -> Self {
        self.inherit_output = true;
        self
    }

    /// Program name or path
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments, in order
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Working directory, if set
    pub fn dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Whether output is passed through
    pub fn inherits_output(&self) -> bool {
        self.inherit_output
    }

    fn failed(&self, status: Option<i32>, stderr: String) -> StagingError {
        StagingError::ToolFailed {
            command: self.to_string(),
            status,
            stderr,
        }
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Output of a successful invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Captured stdout, empty when output is passed through
    pub stdout: String,
    /// Captured stderr, empty when output is passed through
    pub stderr: String,
}

/// Runs external programs
///
/// A run that cannot start or exits unsuccessfully is an error.
pub trait ToolRunner: Send + Sync {
    /// Run one invocation to completion
    fn run(&self, invocation: &ToolInvocation) -> StagingResult<ToolOutput>;
}

/// Runs programs as blocking child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> StagingResult<ToolOutput> {
        debug!(command = %invocation, "running tool");

        let mut command = Command::new(invocation.program());
        command.args(invocation.arguments()).stdin(Stdio::null());
        if let Some(dir) = invocation.dir() {
            command.current_dir(dir);
        }

        let spawn_error = |source| StagingError::Spawn {
            program: invocation.program().to_string(),
            source,
        };

        if invocation.inherits_output() {
            let status = command.status().map_err(spawn_error)?;
            if !status.success() {
                return Err(invocation.failed(status.code(), String::new()));
            }
            return Ok(ToolOutput::default());
        }

        let output = command.output().map_err(spawn_error)?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(invocation.failed(output.status.code(), stderr));
        }
        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
        })
    }
}
