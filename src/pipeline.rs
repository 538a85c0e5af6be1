//! The `Tric` entry point and its builder.

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tric_archive::{ArchiveStore, SifStore};
use tric_core::{ContainerConfig, ContainerMetadata, Settings, ToolSettings, WorkflowConfig};
use tric_engine::{
    BuiltImage, ContainerBuilder, EngineContext, ImageReport, RunInvocation, WorkflowRunner,
};
use tric_staging::{SystemToolRunner, ToolRunner};

/// Builds, runs and audits containerised workflows.
///
/// # Example
///
/// ```ignore
/// use tric::prelude::*;
///
/// let tric = Tric::builder().image_dir("./images").build();
/// let workflow = WorkflowConfig::load("analysis.json")?;
///
/// tric.create(&workflow)?;
/// let record = tric.run(&workflow)?;
/// println!("{}", record.execution_command);
/// ```
#[derive(Debug, Clone)]
pub struct Tric {
    ctx: EngineContext,
}

impl Tric {
    /// Create with settings, using real tools and image files.
    pub fn new(settings: Settings) -> Self {
        Self {
            ctx: EngineContext::system(settings),
        }
    }

    /// Create with settings loaded from `path`, or `./tric.toml`, or defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        Ok(Self::new(Settings::discover(path)?))
    }

    /// Create a builder for custom configuration.
    pub fn builder() -> TricBuilder {
        TricBuilder::new()
    }

    /// Runtime settings in effect.
    pub fn settings(&self) -> &Settings {
        self.ctx.settings()
    }

    /// Image file of a container.
    pub fn image_path(&self, container: &ContainerConfig) -> PathBuf {
        self.ctx.image_path(container)
    }

    /// Build every image of a workflow.
    pub fn create(&self, workflow: &WorkflowConfig) -> Result<Vec<BuiltImage>> {
        Ok(ContainerBuilder::new(self.ctx.clone()).create_workflow(workflow)?)
    }

    /// Load a description file and build it.
    pub fn create_from_file(&self, path: impl AsRef<Path>) -> Result<(WorkflowConfig, Vec<BuiltImage>)> {
        let path = path.as_ref();
        let workflow = WorkflowConfig::load(path)?;
        info!(description = %path.display(), workflow = %workflow.name, "loaded workflow description");
        let built = self.create(&workflow)?;
        Ok((workflow, built))
    }

    /// The command a run of `workflow` executes.
    pub fn compose_run_command(&self, workflow: &WorkflowConfig) -> RunInvocation {
        WorkflowRunner::new(self.ctx.clone()).compose_run_command(workflow)
    }

    /// Run a built workflow and record provenance in its output image.
    pub fn run(&self, workflow: &WorkflowConfig) -> Result<ContainerMetadata> {
        Ok(WorkflowRunner::new(self.ctx.clone()).run(workflow)?)
    }

    /// Load a description file and run it.
    pub fn run_from_file(&self, path: impl AsRef<Path>) -> Result<(WorkflowConfig, ContainerMetadata)> {
        let workflow = WorkflowConfig::load(path.as_ref())?;
        let record = self.run(&workflow)?;
        Ok((workflow, record))
    }

    /// Identity, objects and embedded metadata of an image.
    pub fn inspect(&self, image: impl AsRef<Path>) -> Result<ImageReport> {
        let runner = WorkflowRunner::new(self.ctx.clone());
        Ok(runner.recorder().inspect(image.as_ref())?)
    }
}

/// Builder for [`Tric`].
pub struct TricBuilder {
    settings: Settings,
    store: Option<Arc<dyn ArchiveStore>>,
    runner: Option<Arc<dyn ToolRunner>>,
}

impl TricBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            store: None,
            runner: None,
        }
    }

    /// Replace all settings.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Directory images are written to and run in.
    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.image_dir = dir.into();
        self
    }

    /// Parent directory of transient staging files.
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.work_dir = Some(dir.into());
        self
    }

    /// Architecture recorded on data partitions.
    pub fn architecture(mut self, arch: impl Into<String>) -> Self {
        self.settings.architecture = arch.into();
        self
    }

    /// External program names or paths.
    pub fn tools(mut self, tools: ToolSettings) -> Self {
        self.settings.tools = tools;
        self
    }

    /// Use a custom archive store.
    pub fn store(mut self, store: Arc<dyn ArchiveStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a custom tool runner.
    pub fn tool_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Build the configured instance.
    pub fn build(self) -> Tric {
        let store = self.store.unwrap_or_else(|| Arc::new(SifStore::new()));
        let runner = self.runner.unwrap_or_else(|| Arc::new(SystemToolRunner));
        Tric {
            ctx: EngineContext::new(self.settings, store, runner),
        }
    }
}

impl Default for TricBuilder {
    fn default() -> Self {
        Self::new()
    }
}
