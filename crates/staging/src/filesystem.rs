//! Filesystem staging
//!
//! Builds the raw bytes of an ext3 data partition. The sequence is fixed:
//! stage a directory, copy the source in, create a sized raw file, format
//! it rooted at the staging directory, tune it, read the bytes back. The
//! staging directory and the raw file live in the work directory and are
//! removed when their guards drop, whether the sequence finished or not.
//!
//! ```text
//! <work_dir>/
//! ├── .tric-stage-XXXX/     # StagingDir, the filesystem root
//! │   └── <name>/           # source contents land here
//! └── .tric-raw-XXXX        # RawFile, formatted in place
//! ```

use crate::error::{StagingError, StagingResult};
use crate::tools::{ToolInvocation, ToolRunner};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};
use tracing::debug;
use tric_core::ToolSettings;
use walkdir::WalkDir;

/// A staging directory holding one `<name>/` subdirectory
///
/// Removed with its contents on drop.
#[derive(Debug)]
pub struct StagingDir {
    root: TempDir,
    name: String,
}

impl StagingDir {
    /// Filesystem root passed to the filesystem creator
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Directory the source is copied into, `<root>/<name>`
    pub fn data_dir(&self) -> PathBuf {
        self.root.path().join(&self.name)
    }
}

/// A raw filesystem file, removed on drop
#[derive(Debug)]
pub struct RawFile {
    file: NamedTempFile,
}

impl RawFile {
    /// Location in the work directory
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Current length in bytes
    pub fn len(&self) -> StagingResult<u64> {
        Ok(self.file.as_file().metadata()?.len())
    }

    /// Whether the file is empty
    pub fn is_empty(&self) -> StagingResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Whole contents, as left by the filesystem tools
    pub fn read_bytes(&self) -> StagingResult<Vec<u8>> {
        Ok(fs::read(self.file.path())?)
    }
}

/// Stages data and drives the filesystem tools
#[derive(Clone)]
pub struct FilesystemStaging {
    runner: Arc<dyn ToolRunner>,
    tools: ToolSettings,
    work_dir: PathBuf,
}

impl std::fmt::Debug for FilesystemStaging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilesystemStaging")
            .field("tools", &self.tools)
            .field("work_dir", &self.work_dir)
            .finish_non_exhaustive()
    }
}

impl FilesystemStaging {
    /// Staging in `work_dir`, running tools through `runner`
    pub fn new(runner: Arc<dyn ToolRunner>, tools: ToolSettings, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            tools,
            work_dir: work_dir.into(),
        }
    }

    /// Parent of staging directories and raw files
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Create a fresh staging directory containing an empty `<name>/`
    pub fn stage_directory(&self, name: &str) -> StagingResult<StagingDir> {
        fs::create_dir_all(&self.work_dir)?;
        let root = tempfile::Builder::new()
            .prefix(".tric-stage-")
            .tempdir_in(&self.work_dir)?;
        let staged = StagingDir {
            root,
            name: name.to_string(),
        };
        fs::create_dir(staged.data_dir())?;
        debug!(dir = %staged.data_dir().display(), "staged directory");
        Ok(staged)
    }

    /// Copy `source` into the staging directory's `<name>/`
    ///
    /// A directory's contents are copied recursively; a single file lands
    /// under its own file name. `None` copies nothing. Returns the number
    /// of bytes copied.
    pub fn copy_into(&self, staging: &StagingDir, source: Option<&Path>) -> StagingResult<u64> {
        let Some(source) = source else {
            return Ok(0);
        };
        if !source.exists() {
            return Err(StagingError::SourceMissing(source.to_path_buf()));
        }

        let dest = staging.data_dir();
        if source.is_file() {
            let file_name = source
                .file_name()
                .ok_or_else(|| StagingError::SourceMissing(source.to_path_buf()))?;
            let copied = fs::copy(source, dest.join(file_name))?;
            debug!(source = %source.display(), bytes = copied, "copied file into staging");
            return Ok(copied);
        }

        let mut copied = 0;
        for entry in WalkDir::new(source).min_depth(1).follow_links(true) {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|_| StagingError::SourceMissing(entry.path().to_path_buf()))?;
            let target = dest.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                copied += fs::copy(entry.path(), &target)?;
            }
        }
        debug!(source = %source.display(), bytes = copied, "copied tree into staging");
        Ok(copied)
    }

    /// Create a raw file of exactly `size` bytes in the work directory
    pub fn create_sized_file(&self, size: u64) -> StagingResult<RawFile> {
        fs::create_dir_all(&self.work_dir)?;
        let file = tempfile::Builder::new()
            .prefix(".tric-raw-")
            .tempfile_in(&self.work_dir)?;
        file.as_file().set_len(size)?;
        Ok(RawFile { file })
    }

    /// Format `raw` as ext3, populated from the staging root
    pub fn format_as_filesystem(&self, raw: &RawFile, staging: &StagingDir) -> StagingResult<()> {
        let invocation = ToolInvocation::new(&self.tools.mkfs)
            .arg("-d")
            .arg(staging.root())
            .arg(raw.path());
        self.runner.run(&invocation)?;
        Ok(())
    }

    /// Remove the reserved-block allowance from `raw`
    pub fn tune(&self, raw: &RawFile) -> StagingResult<()> {
        let invocation = ToolInvocation::new(&self.tools.tune2fs)
            .arg("-m")
            .arg("0")
            .arg(raw.path());
        self.runner.run(&invocation)?;
        Ok(())
    }

    /// Run the whole sequence and return the formatted filesystem bytes
    ///
    /// The staging directory and raw file are gone when this returns.
    pub fn build_filesystem(&self, name: &str, source: Option<&Path>, size: u64) -> StagingResult<Vec<u8>> {
        let staging = self.stage_directory(name)?;
        self.copy_into(&staging, source)?;
        let raw = self.create_sized_file(size)?;
        self.format_as_filesystem(&raw, &staging)?;
        self.tune(&raw)?;
        let bytes = raw.read_bytes()?;
        debug!(name, size = bytes.len(), "built filesystem");
        Ok(bytes)
    }
}
