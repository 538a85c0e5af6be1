//! Unified error type for TRIC.
//!
//! Wraps the errors of the member crates into a small set of categories
//! suitable for reporting to users.

use thiserror::Error;
use tric_archive::ArchiveError;
use tric_core::ConfigError;
use tric_engine::EngineError;
use tric_staging::StagingError;

/// All TRIC errors.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on a description, settings or image file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid workflow description, settings or metadata
    #[error("configuration error: {0}")]
    Config(#[source] ConfigError),

    /// Malformed or unusable image
    #[error("image error: {0}")]
    Archive(#[source] ArchiveError),

    /// External tool failed to start or exited unsuccessfully
    #[error("tool error: {0}")]
    Tool(#[source] StagingError),

    /// A workflow build or run failed
    #[error(transparent)]
    Workflow(EngineError),
}

/// Result type for TRIC operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the failure came from an external tool.
    pub fn is_tool_failure(&self) -> bool {
        match self {
            Error::Tool(_) => true,
            Error::Workflow(e) => matches!(root_engine_error(e), EngineError::Staging(_) | EngineError::Run { .. }),
            _ => false,
        }
    }

    /// Name of the container whose build failed, if any.
    pub fn failed_container(&self) -> Option<&str> {
        match self {
            Error::Workflow(e) => e.failed_container(),
            _ => None,
        }
    }
}

fn root_engine_error(e: &EngineError) -> &EngineError {
    match e {
        EngineError::Build { source, .. } => root_engine_error(source),
        other => other,
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Io(io) => Error::Io(io),
            other => Error::Config(other),
        }
    }
}

impl From<ArchiveError> for Error {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::Io(io) => Error::Io(io),
            other => Error::Archive(other),
        }
    }
}

impl From<StagingError> for Error {
    fn from(e: StagingError) -> Self {
        match e {
            StagingError::Io(io) => Error::Io(io),
            other => Error::Tool(other),
        }
    }
}

impl From<EngineError> for Error {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Config(c) => c.into(),
            EngineError::Archive(a) => a.into(),
            EngineError::Staging(s) => s.into(),
            EngineError::Io(io) => Error::Io(io),
            other => Error::Workflow(other),
        }
    }
}
