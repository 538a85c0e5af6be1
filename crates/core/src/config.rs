//! Workflow description
//!
//! A workflow is one application container, an ordered list of input
//! containers and one output container. The description is authored once
//! (JSON file or web form) and never mutated afterwards.
//!
//! ## File Format
//!
//! ```json
//! {
//!   "WorkflowName": "soil-moisture",
//!   "ApplicationContainer": { "Name": "model", "InPath": "model.def" },
//!   "InputContainer": [ { "Name": "covariates", "InPath": "data/", "Size": 1048576 } ],
//!   "OutputContainer": { "Name": "predictions", "Size": 2097152 }
//! }
//! ```
//!
//! Optional fields that are absent are omitted rather than written as `null`.
//!
//! A container's name is used verbatim as the image file stem, the in-image
//! object name and the bind path inside the application. Later stages
//! re-derive all three from the name alone.

use crate::error::{ConfigError, ConfigResult};
use crate::types::ContainerRole;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// File extension of container images
pub const IMAGE_EXTENSION: &str = "sif";

/// Longest container name, bounded by the in-image object name field
pub const MAX_NAME_LEN: usize = 127;

/// One container of a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Container name
    #[serde(rename = "Name")]
    pub name: String,

    /// Definition file (application) or data path (input)
    #[serde(
        rename = "InPath",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_path_as_none"
    )]
    pub source: Option<PathBuf>,

    /// Filesystem size in bytes (input and output only)
    #[serde(
        rename = "Size",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "zero_as_none"
    )]
    pub size: Option<u64>,
}

impl ContainerConfig {
    /// Create a container with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            size: None,
        }
    }

    /// Set the source path
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the filesystem size in bytes
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Image file name, `<name>.sif`
    pub fn image_file_name(&self) -> String {
        format!("{}.{}", self.name, IMAGE_EXTENSION)
    }

    /// Image path inside `dir`
    pub fn image_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.image_file_name())
    }

    /// Mount point of this container inside the application, `/<name>`
    pub fn bind_path(&self) -> String {
        format!("/{}", self.name)
    }
}

/// A complete workflow description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Workflow name, also the stem of the description file written by the web form
    #[serde(rename = "WorkflowName")]
    pub name: String,

    /// The application container
    #[serde(rename = "ApplicationContainer")]
    pub application: ContainerConfig,

    /// Input containers in bind order
    #[serde(rename = "InputContainer", default, deserialize_with = "null_as_empty")]
    pub inputs: Vec<ContainerConfig>,

    /// The output container
    #[serde(rename = "OutputContainer")]
    pub output: ContainerConfig,
}

impl WorkflowConfig {
    /// Load a description file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let data = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Write the description file
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let data = serde_json::to_vec_pretty(self)?;
        std::fs::write(path.as_ref(), data)?;
        Ok(())
    }

    /// Parse a description from a JSON string
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to compact JSON
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// File name the web form writes this description to
    pub fn description_file_name(&self) -> String {
        format!("{}.json", self.name)
    }

    /// All containers with their role and position among containers of that role
    ///
    /// Order: application, inputs in order, output.
    pub fn containers(&self) -> impl Iterator<Item = (ContainerRole, usize, &ContainerConfig)> {
        std::iter::once((ContainerRole::Application, 0, &self.application))
            .chain(
                self.inputs
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (ContainerRole::Input, i, c)),
            )
            .chain(std::iter::once((ContainerRole::Output, 0, &self.output)))
    }

    /// Check that the description can be built and run
    ///
    /// Checks:
    /// - The workflow name is usable as a file stem
    /// - Every container name is usable as file stem, object name and bind path
    /// - Names are unique across the workflow
    /// - The application has a definition file
    /// - Every input and the output has a non-zero size
    pub fn validate(&self) -> ConfigResult<()> {
        validate_name(&self.name)?;
        let mut seen = HashSet::new();
        for (role, _, container) in self.containers() {
            validate_name(&container.name)?;
            if !seen.insert(container.name.as_str()) {
                return Err(ConfigError::DuplicateName(container.name.clone()));
            }
            match role {
                ContainerRole::Application => {
                    if container.source.is_none() {
                        return Err(ConfigError::MissingField {
                            name: container.name.clone(),
                            field: "definition file (InPath)",
                        });
                    }
                }
                ContainerRole::Input | ContainerRole::Output => {
                    if container.size.is_none() {
                        return Err(ConfigError::MissingField {
                            name: container.name.clone(),
                            field: "filesystem size (Size)",
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Check that a container name can double as file stem, object name and bind path
pub fn validate_name(name: &str) -> ConfigResult<()> {
    let reject = |reason| {
        Err(ConfigError::InvalidName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return reject("name is empty");
    }
    if name.len() > MAX_NAME_LEN {
        return reject("name is longer than 127 bytes");
    }
    if name.chars().any(char::is_whitespace) {
        return reject("name contains whitespace");
    }
    if name.contains('/') || name.contains(':') || name.contains('\0') {
        return reject("name contains '/', ':' or NUL");
    }
    if name == "." || name == ".." {
        return reject("name is a relative path component");
    }
    Ok(())
}

fn empty_path_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(PathBuf::from))
}

fn zero_as_none<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<u64> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|&n| n != 0))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ContainerConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<ContainerConfig>> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}
