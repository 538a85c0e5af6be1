//! Provenance records embedded in container images
//!
//! Every image carries one or more JSON metadata objects. Images built by
//! the pipeline carry a `metadata` object with no trail; the output image
//! receives a `metadata.json` object with the full [`RecordTrail`] once the
//! workflow has actually run.
//!
//! ## JSON Shape
//!
//! ```json
//! {
//!   "UUID": "…",
//!   "Name": "predictions",
//!   "CreationTime": "2024-05-01T10:00:00Z",
//!   "ExecutionCommand": "python /app/predict.py",
//!   "RecordTrail": {
//!     "InputContainers": [ { "Name": "covariates", "UUID": "…" } ],
//!     "ApplicationContainer": { "Name": "model", "UUID": "…" },
//!     "OutputContainer": { "Name": "predictions", "UUID": "…" }
//!   }
//! }
//! ```

use crate::error::ConfigResult;
use crate::types::ImageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Object name of metadata attached when an image is built
pub const BUILD_METADATA_NAME: &str = "metadata";

/// Object name of metadata attached to the output image after a run
pub const RUN_METADATA_NAME: &str = "metadata.json";

/// Execution command recorded for images that have not been run
pub const NO_OPERATION: &str = "no operation";

/// Name and identity of one image in a record trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailEntry {
    /// Container name
    #[serde(rename = "Name")]
    pub name: String,
    /// Identity read from the image header
    #[serde(rename = "UUID")]
    pub id: ImageId,
}

impl TrailEntry {
    /// Create a trail entry
    pub fn new(name: impl Into<String>, id: ImageId) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

/// Which images took part in a workflow execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTrail {
    /// Input images in bind order; empty, never null
    #[serde(rename = "InputContainers", default, deserialize_with = "null_as_empty")]
    pub inputs: Vec<TrailEntry>,
    /// The application image
    #[serde(rename = "ApplicationContainer")]
    pub application: Option<TrailEntry>,
    /// The output image
    #[serde(rename = "OutputContainer")]
    pub output: Option<TrailEntry>,
}

impl RecordTrail {
    /// Whether every slot of the trail is filled
    pub fn is_complete(&self) -> bool {
        self.application.is_some() && self.output.is_some()
    }

    /// All entries, inputs first
    pub fn entries(&self) -> impl Iterator<Item = &TrailEntry> {
        self.inputs
            .iter()
            .chain(self.application.iter())
            .chain(self.output.iter())
    }
}

/// Self-describing provenance record of one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMetadata {
    /// Identity read from the image header
    #[serde(rename = "UUID")]
    pub id: ImageId,
    /// Container name
    #[serde(rename = "Name")]
    pub name: String,
    /// Creation time read from the image header
    #[serde(rename = "CreationTime")]
    pub created_at: DateTime<Utc>,
    /// Command that ran against the image, or [`NO_OPERATION`]
    #[serde(rename = "ExecutionCommand")]
    pub execution_command: String,
    /// Present only on output images after a run
    #[serde(rename = "RecordTrail")]
    pub record_trail: Option<RecordTrail>,
}

impl ContainerMetadata {
    /// Metadata for an image that has been built but not run
    pub fn static_record(id: ImageId, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            created_at,
            execution_command: NO_OPERATION.to_string(),
            record_trail: None,
        }
    }

    /// Metadata for an output image after a run
    pub fn run_record(
        id: ImageId,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
        execution_command: impl Into<String>,
        record_trail: RecordTrail,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            created_at,
            execution_command: execution_command.into(),
            record_trail: Some(record_trail),
        }
    }

    /// Whether this record describes an executed workflow
    pub fn has_run(&self) -> bool {
        self.record_trail.is_some()
    }

    /// Encode as the JSON payload of a metadata object
    pub fn to_json_bytes(&self) -> ConfigResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a metadata object payload
    pub fn from_json_bytes(data: &[u8]) -> ConfigResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<TrailEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<TrailEntry>> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}
