//! Archive store
//!
//! [`ArchiveStore`] is the seam the build and provenance layers talk to.
//! [`SifStore`] is the file-backed implementation.

use crate::error::ArchiveResult;
use crate::format::DEFAULT_DESCRIPTOR_CAPACITY;
use crate::image::{AccessMode, Image};
use crate::object::ObjectInput;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;
use tric_core::ImageId;

/// An image that was just created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedImage {
    /// Where it was written
    pub path: PathBuf,
    /// Identity minted for it
    pub id: ImageId,
}

/// Operations on container image archives
pub trait ArchiveStore: Send + Sync {
    /// Create an image holding exactly `objects`, minting a fresh identity
    ///
    /// Either the image exists afterwards with exactly these objects, or
    /// nothing was written at `path`. An existing file at `path` is replaced.
    fn create(&self, path: &Path, objects: Vec<ObjectInput>) -> ArchiveResult<CreatedImage>;

    /// Open an image
    fn open(&self, path: &Path, mode: AccessMode) -> ArchiveResult<Image>;

    /// Append one object to an existing image, returning its id
    fn append(&self, path: &Path, object: ObjectInput) -> ArchiveResult<u32> {
        let mut image = self.open(path, AccessMode::ReadWrite)?;
        let id = image.add_object(object)?;
        image.close()?;
        Ok(id)
    }

    /// Identity read from the image header
    fn identity(&self, path: &Path) -> ArchiveResult<ImageId> {
        let image = self.open(path, AccessMode::ReadOnly)?;
        let id = image.id();
        image.close()?;
        Ok(id)
    }

    /// Creation time read from the image header
    fn created_at(&self, path: &Path) -> ArchiveResult<DateTime<Utc>> {
        let image = self.open(path, AccessMode::ReadOnly)?;
        let created_at = image.created_at();
        image.close()?;
        Ok(created_at)
    }
}

/// File-backed archive store
#[derive(Debug, Clone)]
pub struct SifStore {
    descriptor_capacity: usize,
}

impl SifStore {
    /// Store creating images with the default descriptor table capacity
    pub fn new() -> Self {
        Self {
            descriptor_capacity: DEFAULT_DESCRIPTOR_CAPACITY,
        }
    }

    /// Set the descriptor table capacity of newly created images
    pub fn with_descriptor_capacity(mut self, capacity: usize) -> Self {
        self.descriptor_capacity = capacity;
        self
    }

    /// Descriptor table capacity of newly created images
    pub fn descriptor_capacity(&self) -> usize {
        self.descriptor_capacity
    }
}

impl Default for SifStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveStore for SifStore {
    fn create(&self, path: &Path, objects: Vec<ObjectInput>) -> ArchiveResult<CreatedImage> {
        for object in &objects {
            object.validate()?;
        }

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let staging = tempfile::Builder::new()
            .prefix(".tric-image-")
            .tempfile_in(parent)?;
        let file = staging.as_file().try_clone()?;

        let id = ImageId::mint();
        let mut image = Image::initialize(
            file,
            staging.path().to_path_buf(),
            id,
            Utc::now(),
            self.descriptor_capacity,
        )?;
        for object in objects {
            image.add_object(object)?;
        }
        image.close()?;
        staging.persist(path)?;

        debug!(path = %path.display(), %id, "created image");
        Ok(CreatedImage {
            path: path.to_path_buf(),
            id,
        })
    }

    fn open(&self, path: &Path, mode: AccessMode) -> ArchiveResult<Image> {
        Image::open(path, mode)
    }
}
