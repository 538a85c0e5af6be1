//! Filesystem staging for TRIC image builds
//!
//! - [`FilesystemStaging`] turns a source directory or file into the bytes
//!   of a formatted ext3 filesystem of a fixed size
//! - [`ToolRunner`] is the seam every external program goes through

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod filesystem;
pub mod tools;

pub use error::{StagingError, StagingResult};
pub use filesystem::{FilesystemStaging, RawFile, StagingDir};
pub use tools::{SystemToolRunner, ToolInvocation, ToolOutput, ToolRunner};
