//! Staging and tool errors

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from filesystem staging and external tools
#[derive(Debug, Error)]
pub enum StagingError {
    /// I/O error in the work directory
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error walking a source tree
    #[error("error reading source tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// Configured source does not exist
    #[error("source {} does not exist", .0.display())]
    SourceMissing(PathBuf),

    /// Tool could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program name or path
        program: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Tool exited unsuccessfully
    #[error("`{command}` exited with {}{}", exit_label(.status), stderr_suffix(.stderr))]
    ToolFailed {
        /// Rendered command line
        command: String,
        /// Exit code, absent when killed by a signal
        status: Option<i32>,
        /// Captured standard error, if any
        stderr: String,
    },
}

/// Result type for staging operations
pub type StagingResult<T> = std::result::Result<T, StagingError>;

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}
