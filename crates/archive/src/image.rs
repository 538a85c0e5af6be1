//! Open image handle
//!
//! An [`Image`] is acquired read-only or writable and released with
//! [`Image::close`] (or by dropping it). Objects are only ever appended;
//! existing payloads and descriptors are never rewritten.

use crate::error::{ArchiveError, ArchiveResult};
use crate::format::{
    align_up, from_unix_seconds, unix_seconds, Header, RawDescriptor, DEFAULT_GROUP,
    DESCRIPTOR_SIZE, HEADER_SIZE,
};
use crate::object::{arch_code, DataType, Descriptor, Object, ObjectInput, PartType};
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tric_core::ImageId;

/// How an image is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Objects may be appended
    ReadWrite,
    /// Queries only
    #[default]
    ReadOnly,
}

impl AccessMode {
    /// Whether appends are allowed
    pub fn is_writable(&self) -> bool {
        matches!(self, AccessMode::ReadWrite)
    }
}

/// An open image
#[derive(Debug)]
pub struct Image {
    file: File,
    path: PathBuf,
    mode: AccessMode,
    header: Header,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    // every descriptor slot, used or not
    slots: Vec<RawDescriptor>,
}

impl Image {
    /// Open an existing image
    pub fn open(path: impl AsRef<Path>, mode: AccessMode) -> ArchiveResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(mode.is_writable())
            .open(path)?;
        Self::load(file, path.to_path_buf(), mode)
    }

    /// Write an empty image (header and blank descriptor table) into `file`
    pub(crate) fn initialize(
        mut file: File,
        path: PathBuf,
        id: ImageId,
        created_at: DateTime<Utc>,
        capacity: usize,
    ) -> ArchiveResult<Self> {
        let header = Header::new(id, created_at, capacity);
        file.seek(SeekFrom::Start(0))?;
        header.encode(&mut file)?;
        let blank = RawDescriptor::empty().to_bytes();
        for _ in 0..capacity {
            file.write_all(&blank)?;
        }
        file.set_len(header.data_offset as u64)?;
        let created_at = from_unix_seconds(header.created_at)?;

        Ok(Self {
            file,
            path,
            mode: AccessMode::ReadWrite,
            header,
            created_at,
            modified_at: created_at,
            slots: vec![RawDescriptor::empty(); capacity],
        })
    }

    fn load(mut file: File, path: PathBuf, mode: AccessMode) -> ArchiveResult<Self> {
        let file_len = file.metadata()?.len();
        if file_len < HEADER_SIZE as u64 {
            return Err(ArchiveError::NotAnImage { path });
        }

        file.seek(SeekFrom::Start(0))?;
        let mut header_bytes = [0u8; HEADER_SIZE];
        file.read_exact(&mut header_bytes)?;
        let header = match Header::decode(&mut &header_bytes[..])? {
            Some(header) => header,
            None => return Err(ArchiveError::NotAnImage { path }),
        };
        header.check(file_len)?;
        let created_at = from_unix_seconds(header.created_at)?;
        let modified_at = from_unix_seconds(header.modified_at)?;

        let mut table = vec![0u8; header.descriptors_size as usize];
        file.seek(SeekFrom::Start(header.descriptors_offset as u64))?;
        file.read_exact(&mut table)?;

        let mut slots = Vec::with_capacity(header.descriptors_total as usize);
        let mut reader = &table[..];
        for _ in 0..header.descriptors_total {
            let raw = RawDescriptor::decode(&mut reader)?;
            if raw.used {
                let end = raw.offset.checked_add(raw.size).unwrap_or(i64::MAX);
                if raw.size < 0
                    || raw.offset < header.data_offset
                    || end as u64 > header.data_end()
                {
                    return Err(ArchiveError::corrupt(format!(
                        "object {} lies outside the data section",
                        raw.id
                    )));
                }
            }
            slots.push(raw);
        }

        let used = slots.iter().filter(|s| s.used).count() as i64;
        if header.descriptors_total - used != header.descriptors_free {
            return Err(ArchiveError::corrupt(format!(
                "header lists {} free descriptors, table has {}",
                header.descriptors_free,
                header.descriptors_total - used
            )));
        }

        debug!(path = %path.display(), id = %header.id, objects = used, "opened image");

        Ok(Self {
            file,
            path,
            mode,
            header,
            created_at,
            modified_at,
            slots,
        })
    }

    /// Image identity, as stored in the header
    pub fn id(&self) -> ImageId {
        self.header.id
    }

    /// Creation time, as stored in the header
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last append
    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    /// Path the image was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Access mode of this handle
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Raw header
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of free descriptor slots
    pub fn free_slots(&self) -> usize {
        self.header.descriptors_free as usize
    }

    /// Descriptors of every stored object, in id order
    pub fn descriptors(&self) -> ArchiveResult<Vec<Descriptor>> {
        let mut out = self
            .slots
            .iter()
            .filter(|s| s.used)
            .map(RawDescriptor::to_descriptor)
            .collect::<ArchiveResult<Vec<_>>>()?;
        out.sort_by_key(|d| d.id);
        Ok(out)
    }

    /// Descriptors of stored objects of one type, in id order
    pub fn descriptors_of_type(&self, data_type: DataType) -> ArchiveResult<Vec<Descriptor>> {
        Ok(self
            .descriptors()?
            .into_iter()
            .filter(|d| d.data_type == data_type)
            .collect())
    }

    /// First object with the given name
    pub fn find(&self, name: &str) -> ArchiveResult<Option<Descriptor>> {
        Ok(self.descriptors()?.into_iter().find(|d| d.name == name))
    }

    /// Read an object's payload
    pub fn read(&self, descriptor: &Descriptor) -> ArchiveResult<Vec<u8>> {
        let mut data = vec![0u8; descriptor.size as usize];
        let mut file = &self.file;
        file.seek(SeekFrom::Start(descriptor.offset))?;
        file.read_exact(&mut data)?;
        Ok(data)
    }

    /// Every object of one type with its payload, in id order
    pub fn objects_of_type(&self, data_type: DataType) -> ArchiveResult<Vec<Object>> {
        self.descriptors_of_type(data_type)?
            .into_iter()
            .map(|descriptor| {
                let data = self.read(&descriptor)?;
                Ok(Object { descriptor, data })
            })
            .collect()
    }

    /// Append an object, returning its id
    ///
    /// The payload is written first, then its descriptor, then the header,
    /// so an interrupted append leaves unreferenced bytes past the data
    /// section and the image otherwise unchanged.
    pub fn add_object(&mut self, input: ObjectInput) -> ArchiveResult<u32> {
        if !self.mode.is_writable() {
            return Err(ArchiveError::ReadOnly(self.path.clone()));
        }
        input.validate()?;

        let slot = self
            .slots
            .iter()
            .position(|s| !s.used)
            .ok_or(ArchiveError::DescriptorTableFull {
                capacity: self.slots.len(),
            })?;
        let id = self.slots.iter().map(|s| s.id).max().unwrap_or(0) + 1;

        let data_end = self.header.data_end();
        let offset = align_up(data_end, input.alignment);
        let padding = offset - data_end;
        let size = input.data.len() as u64;
        let now = unix_seconds(Utc::now());
        let modified_at = from_unix_seconds(now)?;

        let mut raw = RawDescriptor::empty();
        raw.data_type = input.data_type.code();
        raw.used = true;
        raw.id = id;
        raw.group_id = DEFAULT_GROUP;
        raw.offset = offset as i64;
        raw.size = size as i64;
        raw.size_with_padding = (padding + size) as i64;
        raw.created_at = now;
        raw.modified_at = now;
        raw.set_name(&input.name);
        if let Some(info) = &input.partition {
            raw.set_partition(info);
        }

        // payload
        self.file.seek(SeekFrom::Start(data_end))?;
        if padding > 0 {
            self.file.write_all(&vec![0u8; padding as usize])?;
        }
        self.file.write_all(&input.data)?;

        // descriptor
        let slot_offset = self.header.descriptors_offset as u64 + (slot * DESCRIPTOR_SIZE) as u64;
        self.file.seek(SeekFrom::Start(slot_offset))?;
        raw.encode(&mut self.file)?;

        // header
        let mut header = self.header.clone();
        header.data_size += (padding + size) as i64;
        header.descriptors_free -= 1;
        header.modified_at = now;
        if let Some(info) = input.partition.as_ref().filter(|i| i.part == PartType::PrimarySystem) {
            let mut arch = [0u8; 3];
            arch[..2].copy_from_slice(&arch_code(&info.arch).as_bytes()[..2]);
            header.arch = arch;
        }
        self.file.seek(SeekFrom::Start(0))?;
        header.encode(&mut self.file)?;

        debug!(
            path = %self.path.display(),
            id,
            name = %input.name,
            data_type = %input.data_type,
            size,
            "appended object"
        );

        self.header = header;
        self.modified_at = modified_at;
        self.slots[slot] = raw;
        Ok(id)
    }

    /// Flush pending writes to disk
    pub fn sync(&self) -> ArchiveResult<()> {
        if self.mode.is_writable() {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Release the image, syncing writes first
    pub fn close(self) -> ArchiveResult<()> {
        self.sync()
    }
}
