//! Provenance recording
//!
//! After a run, every participating image is re-opened and its identity
//! read from its own header. The resulting record trail, together with the
//! application's run-script, is appended to the output image as a single
//! `metadata.json` object.

use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tric_archive::{AccessMode, ArchiveError, ArchiveResult, ArchiveStore, DataType, Descriptor, ObjectInput};
use tric_core::{
    ContainerConfig, ContainerMetadata, ContainerRole, ImageId, RecordTrail, TrailEntry,
    WorkflowConfig, BUILD_METADATA_NAME, RUN_METADATA_NAME,
};

const RUNSCRIPT_MARKER: &str = "%runscript";

/// Run-script section of a definition file
///
/// Takes the text after `%runscript` up to the next line starting with `%`,
/// turns newlines into spaces and trims surrounding spaces. Returns an empty
/// string when there is no `%runscript` section.
pub fn extract_runscript(definition: &str) -> String {
    let Some(start) = definition.find(RUNSCRIPT_MARKER) else {
        return String::new();
    };
    let section = &definition[start + RUNSCRIPT_MARKER.len()..];

    let mut script = String::new();
    for (i, line) in section.split('\n').enumerate() {
        if i > 0 {
            if line.starts_with('%') {
                break;
            }
            script.push(' ');
        }
        script.push_str(line);
    }
    script.trim_matches(' ').to_string()
}

/// What an image says about itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReport {
    /// Image file
    pub path: PathBuf,
    /// Identity from the header
    pub id: ImageId,
    /// Creation time from the header
    pub created_at: DateTime<Utc>,
    /// Time of the last append
    pub modified_at: DateTime<Utc>,
    /// Architecture recorded in the header
    pub architecture: &'static str,
    /// Every stored object, in id order
    pub objects: Vec<Descriptor>,
    /// Every embedded metadata record, in append order
    pub metadata: Vec<ContainerMetadata>,
}

/// Reads identities back from images and records provenance
pub struct ProvenanceRecorder<'a> {
    store: &'a dyn ArchiveStore,
    image_dir: &'a Path,
}

impl<'a> ProvenanceRecorder<'a> {
    /// Recorder over images in `image_dir`
    pub fn new(store: &'a dyn ArchiveStore, image_dir: &'a Path) -> Self {
        Self { store, image_dir }
    }

    /// Trail of every participating image, identities freshly re-read
    pub fn build_record_trail(&self, config: &WorkflowConfig) -> EngineResult<RecordTrail> {
        let mut trail = RecordTrail::default();
        for (role, _, container) in config.containers() {
            let entry = TrailEntry::new(container.name.clone(), self.identity(role, container)?);
            match role {
                ContainerRole::Application => trail.application = Some(entry),
                ContainerRole::Input => trail.inputs.push(entry),
                ContainerRole::Output => trail.output = Some(entry),
            }
        }
        debug!(workflow = %config.name, entries = trail.entries().count(), "built record trail");
        Ok(trail)
    }

    /// Run-script sections of every definition file in an image, one per line
    pub fn runscript_of(&self, image: &Path) -> EngineResult<String> {
        Ok(self.read_runscripts(image)?)
    }

    fn read_runscripts(&self, image: &Path) -> ArchiveResult<String> {
        let image = self.store.open(image, AccessMode::ReadOnly)?;
        let scripts: Vec<String> = image
            .objects_of_type(DataType::DefFile)?
            .iter()
            .map(|def| extract_runscript(&String::from_utf8_lossy(&def.data)))
            .collect();
        image.close()?;
        Ok(scripts.join("\n"))
    }

    /// Append the run record to the output image
    ///
    /// Identity and creation time are read from the output image itself.
    pub fn annotate_output(&self, config: &WorkflowConfig) -> EngineResult<ContainerMetadata> {
        let trail = self.build_record_trail(config)?;
        let app_path = self.path_of(&config.application);
        let runscript = self
            .read_runscripts(&app_path)
            .map_err(|source| EngineError::Image {
                role: ContainerRole::Application,
                path: app_path.clone(),
                source,
            })?;

        let path = self.path_of(&config.output);
        let output_error = |source: ArchiveError| EngineError::Image {
            role: ContainerRole::Output,
            path: path.clone(),
            source,
        };
        let mut image = self
            .store
            .open(&path, AccessMode::ReadWrite)
            .map_err(output_error)?;
        let record = ContainerMetadata::run_record(
            image.id(),
            config.output.name.clone(),
            image.created_at(),
            runscript,
            trail,
        );
        let json = record.to_json_bytes()?;
        image
            .add_object(ObjectInput::generic_json(RUN_METADATA_NAME, json))
            .map_err(output_error)?;
        image.close().map_err(output_error)?;

        info!(
            output = %config.output.name,
            id = %record.id,
            command = %record.execution_command,
            "annotated output image"
        );
        Ok(record)
    }

    /// Every metadata record embedded in an image, in append order
    pub fn read_metadata(&self, image: &Path) -> EngineResult<Vec<ContainerMetadata>> {
        Ok(self.inspect(image)?.metadata)
    }

    /// Header, object table and metadata of an image
    pub fn inspect(&self, path: &Path) -> EngineResult<ImageReport> {
        let image = self.store.open(path, AccessMode::ReadOnly)?;
        let metadata = image
            .objects_of_type(DataType::GenericJson)?
            .into_iter()
            .filter(|o| {
                o.descriptor.name == BUILD_METADATA_NAME || o.descriptor.name == RUN_METADATA_NAME
            })
            .map(|o| ContainerMetadata::from_json_bytes(&o.data))
            .collect::<Result<Vec<_>, _>>()?;
        let report = ImageReport {
            path: path.to_path_buf(),
            id: image.id(),
            created_at: image.created_at(),
            modified_at: image.modified_at(),
            architecture: image.header().arch_name(),
            objects: image.descriptors()?,
            metadata,
        };
        image.close()?;
        Ok(report)
    }

    fn path_of(&self, container: &ContainerConfig) -> PathBuf {
        container.image_path(self.image_dir)
    }

    fn identity(&self, role: ContainerRole, container: &ContainerConfig) -> EngineResult<ImageId> {
        let path = self.path_of(container);
        self.store
            .identity(&path)
            .map_err(|source| EngineError::Image { role, path, source })
    }
}
