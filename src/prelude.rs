//! Convenient imports for TRIC.
//!
//! ```ignore
//! use tric::prelude::*;
//!
//! let tric = Tric::builder().image_dir("./images").build();
//! tric.create(&WorkflowConfig::load("analysis.json")?)?;
//! ```

// Main entry point
pub use crate::pipeline::{Tric, TricBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Workflow descriptions and settings
pub use tric_core::{ContainerConfig, Settings, SizeUnit, ToolSettings, WorkflowConfig};

// Provenance
pub use tric_core::{ContainerMetadata, ImageId, RecordTrail, TrailEntry};

// Results of builds, runs and inspection
pub use tric_engine::{BuiltImage, ImageReport, RunInvocation};
