//! Workflow build, run and provenance engine
//!
//! Three stages, all sequential and blocking:
//!
//! 1. [`ContainerBuilder`] builds the application, input and output images
//! 2. [`WorkflowRunner`] runs the composed container command over them
//! 3. [`ProvenanceRecorder`] re-reads every image identity and appends the
//!    record trail to the output image
//!
//! Build and run are separate invocations; a run only needs the workflow
//! description and the images on disk.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod context;
pub mod error;
pub mod provenance;
pub mod runner;

#[cfg(test)]
mod testing;

pub use builder::{BuiltImage, ContainerBuilder};
pub use context::EngineContext;
pub use error::{EngineError, EngineResult};
pub use provenance::{extract_runscript, ImageReport, ProvenanceRecorder};
pub use runner::{RunInvocation, WorkflowRunner};
