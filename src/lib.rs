//! # TRIC
//!
//! Traceable, reproducible workflows built from individually containerised
//! images.
//!
//! A workflow is one application image, any number of input-data images and
//! one output image. Every image carries its own identity and metadata; after
//! a run, the output image also carries the record trail of every image that
//! took part and the command that was executed.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tric::prelude::*;
//!
//! let tric = Tric::discover(None)?;
//! let workflow = WorkflowConfig::load("analysis.json")?;
//!
//! // Build application, input and output images
//! tric.create(&workflow)?;
//!
//! // Run, then read the provenance back from the output image
//! tric.run(&workflow)?;
//! let report = tric.inspect(tric.image_path(&workflow.output))?;
//! ```
//!
//! ## Crates
//!
//! - [`model`] - workflow descriptions, identities, metadata, settings
//! - [`archive`] - the multi-object image format
//! - [`staging`] - filesystem staging and external tools
//! - [`engine`] - builds, runs and provenance recording

#![warn(missing_docs)]

mod error;
mod pipeline;

pub mod prelude;

pub use error::{Error, Result};
pub use pipeline::{Tric, TricBuilder};

pub use tric_archive as archive;
pub use tric_core as model;
pub use tric_engine as engine;
pub use tric_staging as staging;
