//! Engine errors

use std::path::PathBuf;
use thiserror::Error;
use tric_archive::ArchiveError;
use tric_core::{ConfigError, ContainerRole};
use tric_staging::StagingError;

/// Errors from building, running and annotating a workflow
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid workflow description or metadata payload
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Archive read or write failure
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Staging or external tool failure
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// I/O error outside staging and archives
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A container failed to build; earlier containers are left in place
    #[error("failed to build {role} container {name:?} (#{index})")]
    Build {
        /// Which kind of container
        role: ContainerRole,
        /// Position among containers of that role
        index: usize,
        /// Container name
        name: String,
        /// Underlying failure
        #[source]
        source: Box<EngineError>,
    },

    /// The composed run command failed; the output image is left unannotated
    #[error("workflow {workflow:?} failed to run")]
    Run {
        /// Workflow name
        workflow: String,
        /// Underlying failure
        #[source]
        source: StagingError,
    },

    /// A participating image could not be read back
    #[error("cannot read {role} image {}", .path.display())]
    Image {
        /// Which kind of container
        role: ContainerRole,
        /// Image file
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: ArchiveError,
    },
}

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Name of the container a build failure belongs to
    pub fn failed_container(&self) -> Option<&str> {
        match self {
            EngineError::Build { name, .. } => Some(name),
            _ => None,
        }
    }
}
