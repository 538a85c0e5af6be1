//! Error types for workflow configuration and provenance records

use thiserror::Error;

/// Errors raised while loading, parsing or validating workflow configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading or writing a description or settings file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON description or metadata object
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed TOML settings file
    #[error("settings error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A workflow or container name that cannot be used as a file name, object name and bind path
    #[error("invalid name {name:?}: {reason}")]
    InvalidName {
        /// The offending name
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Two containers in one workflow share a name
    #[error("duplicate container name {0:?}")]
    DuplicateName(String),

    /// A required field is absent
    #[error("missing {field} for container {name:?}")]
    MissingField {
        /// Container the field belongs to
        name: String,
        /// Field description
        field: &'static str,
    },

    /// Size value or unit out of range
    #[error("invalid size: {0}")]
    InvalidSize(String),

    /// A web form submission that cannot be turned into a workflow
    #[error("error parsing {0}")]
    Form(&'static str),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
