//! Shared collaborators of the builder, runner and recorder

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tric_archive::{ArchiveStore, SifStore};
use tric_core::{ContainerConfig, Settings};
use tric_staging::{FilesystemStaging, SystemToolRunner, ToolRunner};

/// Settings, archive store and tool runner used by one pipeline
#[derive(Clone)]
pub struct EngineContext {
    settings: Settings,
    store: Arc<dyn ArchiveStore>,
    runner: Arc<dyn ToolRunner>,
}

impl EngineContext {
    /// Context with explicit collaborators
    pub fn new(settings: Settings, store: Arc<dyn ArchiveStore>, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            settings,
            store,
            runner,
        }
    }

    /// Context backed by image files and real child processes
    pub fn system(settings: Settings) -> Self {
        Self::new(settings, Arc::new(SifStore::new()), Arc::new(SystemToolRunner))
    }

    /// Runtime settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Archive store
    pub fn store(&self) -> &dyn ArchiveStore {
        self.store.as_ref()
    }

    /// Tool runner
    pub fn runner(&self) -> &dyn ToolRunner {
        self.runner.as_ref()
    }

    /// Directory holding the images
    pub fn image_dir(&self) -> &Path {
        &self.settings.image_dir
    }

    /// Image file of a container
    pub fn image_path(&self, container: &ContainerConfig) -> PathBuf {
        container.image_path(self.image_dir())
    }

    /// Filesystem staging in the configured work directory
    pub fn staging(&self) -> FilesystemStaging {
        FilesystemStaging::new(
            Arc::clone(&self.runner),
            self.settings.tools.clone(),
            self.settings.work_dir(),
        )
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
