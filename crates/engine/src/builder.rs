//! Container image builds
//!
//! A workflow builds into N + 2 images in the image directory:
//!
//! - the application image, built by the container runtime from its
//!   definition file, then given a `metadata` object
//! - one image per input, holding a single ext3 data partition with the
//!   input's data, then given a `metadata` object
//! - the output image, holding a single empty ext3 data partition and no
//!   metadata until the workflow has run

use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tric_archive::{AccessMode, ArchiveStore, ObjectInput, PartitionInfo};
use tric_core::{
    ConfigError, ContainerConfig, ContainerMetadata, ContainerRole, ImageId, WorkflowConfig,
    BUILD_METADATA_NAME,
};
use tric_staging::ToolInvocation;

/// One image produced by a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltImage {
    /// Which kind of container
    pub role: ContainerRole,
    /// Container name
    pub name: String,
    /// Image file
    pub path: PathBuf,
    /// Identity read back from the image
    pub id: ImageId,
}

/// Builds application, input and output images
#[derive(Debug, Clone)]
pub struct ContainerBuilder {
    ctx: EngineContext,
}

impl ContainerBuilder {
    /// Builder using `ctx`
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Build every image of a workflow: application, inputs in order, output
    ///
    /// Stops at the first failure. Images built before it stay on disk.
    pub fn create_workflow(&self, config: &WorkflowConfig) -> EngineResult<Vec<BuiltImage>> {
        config.validate()?;
        std::fs::create_dir_all(self.ctx.image_dir())?;
        info!(
            workflow = %config.name,
            inputs = config.inputs.len(),
            image_dir = %self.ctx.image_dir().display(),
            "creating workflow"
        );

        let mut built = Vec::with_capacity(config.inputs.len() + 2);
        for (role, index, container) in config.containers() {
            info!(%role, index, name = %container.name, "building container");
            let result = match role {
                ContainerRole::Application => self.build_application(container),
                ContainerRole::Input => self.build_input(container),
                ContainerRole::Output => self.build_output(container),
            };
            let image = result.map_err(|source| EngineError::Build {
                role,
                index,
                name: container.name.clone(),
                source: Box::new(source),
            })?;
            info!(%role, name = %image.name, id = %image.id, "built container");
            built.push(image);
        }

        info!(workflow = %config.name, images = built.len(), "workflow created");
        Ok(built)
    }

    /// Build the application image from its definition file
    pub fn build_application(&self, container: &ContainerConfig) -> EngineResult<BuiltImage> {
        let source = container.source.as_deref().ok_or_else(|| ConfigError::MissingField {
            name: container.name.clone(),
            field: "definition file (InPath)",
        })?;
        let path = self.ctx.image_path(container);

        let invocation = ToolInvocation::new(&self.ctx.settings().tools.apptainer)
            .args(["build", "--fakeroot", "--force"])
            .arg(&path)
            .arg(source);
        self.ctx.runner().run(&invocation)?;

        let id = self.embed_static_metadata(&path, &container.name)?;
        Ok(self.built(ContainerRole::Application, container, path, id))
    }

    /// Build an input image holding the input's data
    pub fn build_input(&self, container: &ContainerConfig) -> EngineResult<BuiltImage> {
        let path = self.build_data_image(container, container.source.as_deref())?;
        let id = self.embed_static_metadata(&path, &container.name)?;
        Ok(self.built(ContainerRole::Input, container, path, id))
    }

    /// Build the empty output image
    pub fn build_output(&self, container: &ContainerConfig) -> EngineResult<BuiltImage> {
        let path = self.build_data_image(container, None)?;
        let id = self.ctx.store().identity(&path)?;
        Ok(self.built(ContainerRole::Output, container, path, id))
    }

    fn build_data_image(&self, container: &ContainerConfig, source: Option<&Path>) -> EngineResult<PathBuf> {
        let size = container.size.ok_or_else(|| ConfigError::MissingField {
            name: container.name.clone(),
            field: "filesystem size (Size)",
        })?;
        let bytes = self
            .ctx
            .staging()
            .build_filesystem(&container.name, source, size)?;

        let path = self.ctx.image_path(container);
        let partition = ObjectInput::partition(
            container.name.clone(),
            bytes,
            PartitionInfo::ext3_data(self.ctx.settings().architecture.clone()),
        );
        let created = self.ctx.store().create(&path, vec![partition])?;
        debug!(name = %container.name, id = %created.id, "created data image");
        Ok(created.path)
    }

    // Identity and creation time come from the image itself.
    fn embed_static_metadata(&self, path: &Path, name: &str) -> EngineResult<ImageId> {
        let mut image = self.ctx.store().open(path, AccessMode::ReadWrite)?;
        let record = ContainerMetadata::static_record(image.id(), name, image.created_at());
        image.add_object(ObjectInput::generic_json(
            BUILD_METADATA_NAME,
            record.to_json_bytes()?,
        ))?;
        image.close()?;
        debug!(name, id = %record.id, "embedded build metadata");
        Ok(record.id)
    }

    fn built(&self, role: ContainerRole, container: &ContainerConfig, path: PathBuf, id: ImageId) -> BuiltImage {
        BuiltImage {
            role,
            name: container.name.clone(),
            path,
            id,
        }
    }
}
