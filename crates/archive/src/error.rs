//! Archive error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by image archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with an image header
    #[error("{path}: not a container image (bad magic)")]
    NotAnImage {
        /// File that was opened
        path: PathBuf,
    },

    /// Header version this implementation cannot read
    #[error("unsupported image format version {version:?}")]
    UnsupportedVersion {
        /// Version string found in the header
        version: String,
    },

    /// Header or descriptor table is inconsistent with the file
    #[error("corrupt image: {0}")]
    Corrupt(String),

    /// No free descriptor slot remains
    #[error("descriptor table full ({capacity} entries)")]
    DescriptorTableFull {
        /// Table capacity
        capacity: usize,
    },

    /// Object cannot be written (bad name, missing partition info, ...)
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// Write attempted through a read-only handle
    #[error("image {0} is open read-only")]
    ReadOnly(PathBuf),
}

impl ArchiveError {
    /// Create a corruption error
    pub fn corrupt(msg: impl Into<String>) -> Self {
        ArchiveError::Corrupt(msg.into())
    }

    /// Create an invalid-object error
    pub fn invalid_object(msg: impl Into<String>) -> Self {
        ArchiveError::InvalidObject(msg.into())
    }
}

impl From<tempfile::PersistError> for ArchiveError {
    fn from(e: tempfile::PersistError) -> Self {
        ArchiveError::Io(e.error)
    }
}

/// Result type for archive operations.
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;
