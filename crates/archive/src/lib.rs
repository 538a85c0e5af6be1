//! Container image archives
//!
//! A container image is a single file holding typed, named objects:
//! filesystem partitions, definition files and JSON metadata. Each image
//! carries one identity, minted when the file is created, and a creation
//! time. Objects are appended and never rewritten or removed.
//!
//! ## Layout
//!
//! ```text
//! <name>.sif
//! ├── global header       # magic, version, identity, timestamps
//! ├── descriptor table    # one fixed-size entry per object
//! └── data section        # object payloads, appended in order
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let store = SifStore::new();
//! let created = store.create(path, vec![ObjectInput::partition(name, bytes, info)])?;
//!
//! let image = store.open(path, AccessMode::ReadOnly)?;
//! assert_eq!(image.id(), created.id);
//! let defs = image.objects_of_type(DataType::DefFile)?;
//! image.close()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod format;
pub mod image;
pub mod object;
pub mod store;

pub use error::{ArchiveError, ArchiveResult};
pub use image::{AccessMode, Image};
pub use object::{
    DataType, Descriptor, FsType, Object, ObjectInput, PartType, PartitionInfo,
    MAX_OBJECT_NAME_LEN,
};
pub use store::{ArchiveStore, CreatedImage, SifStore};
