//! Core types for TRIC
//!
//! This crate defines the data shared by every other layer:
//! - Workflow descriptions and their validation
//! - Image identities
//! - Provenance metadata and record trails
//! - Size units and runtime settings

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod metadata;
pub mod settings;
pub mod size;
pub mod types;

pub use config::{validate_name, ContainerConfig, WorkflowConfig, IMAGE_EXTENSION};
pub use error::{ConfigError, ConfigResult};
pub use metadata::{
    ContainerMetadata, RecordTrail, TrailEntry, BUILD_METADATA_NAME, NO_OPERATION,
    RUN_METADATA_NAME,
};
pub use settings::{Settings, ToolSettings, WebSettings};
pub use size::{size_in_bytes, SizeUnit};
pub use types::{ContainerRole, ImageId};
