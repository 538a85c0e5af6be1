//! On-disk byte layout of an image
//!
//! ```text
//! offset 0      global header (128 bytes)
//! offset 128    descriptor table (capacity × 585 bytes)
//! data_offset   data section, page aligned; objects appended in order
//! ```
//!
//! All integers are little-endian. Text fields are NUL padded.
//!
//! ## Global Header
//!
//! | Field | Size |
//! |-------|------|
//! | launch script | 32 |
//! | magic `SIF_MAGIC\0` | 10 |
//! | version `01\0` | 3 |
//! | architecture code | 3 |
//! | identity (UUID) | 16 |
//! | created at, modified at (unix seconds) | 2 × i64 |
//! | descriptors free, total, offset, size | 4 × i64 |
//! | data offset, data size | 2 × i64 |
//!
//! ## Descriptor
//!
//! | Field | Size |
//! |-------|------|
//! | data type | i32 |
//! | used | u8 |
//! | id, group id, linked id | 3 × u32 |
//! | offset, size, size with padding | 3 × i64 |
//! | created at, modified at, uid, gid | 4 × i64 |
//! | name | 128 |
//! | extra | 384 |

use crate::error::{ArchiveError, ArchiveResult};
use crate::object::{
    arch_code, arch_name, DataType, Descriptor, FsType, PartType, PartitionInfo,
    UNKNOWN_ARCH_CODE,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, TimeZone, Utc};
use std::io::{Read, Write};
use tric_core::ImageId;

/// Launch script prefix that makes an image directly executable
pub const LAUNCH_SCRIPT: &[u8] = b"#!/usr/bin/env run-singularity\n";
/// Launch script field width
pub const LAUNCH_SCRIPT_LEN: usize = 32;
/// Magic bytes
pub const MAGIC: [u8; 10] = *b"SIF_MAGIC\0";
/// Format version
pub const FORMAT_VERSION: [u8; 3] = *b"01\0";
/// Global header size
pub const HEADER_SIZE: usize = 128;
/// Size of one descriptor table entry
pub const DESCRIPTOR_SIZE: usize = 585;
/// Descriptor name field width
pub const NAME_LEN: usize = 128;
/// Descriptor extra field width
pub const EXTRA_LEN: usize = 384;
/// Descriptor table capacity of newly created images
pub const DEFAULT_DESCRIPTOR_CAPACITY: usize = 48;
/// Alignment of the data section start
pub const DATA_ALIGNMENT: u64 = 4096;
/// Bits marking a group id
pub const GROUP_MASK: u32 = 0xf000_0000;
/// Group every object is placed in
pub const DEFAULT_GROUP: u32 = 1 | GROUP_MASK;

/// Round `value` up to a multiple of `align`
pub fn align_up(value: u64, align: u64) -> u64 {
    if align <= 1 {
        return value;
    }
    value.div_ceil(align) * align
}

pub(crate) fn unix_seconds(time: DateTime<Utc>) -> i64 {
    time.timestamp()
}

pub(crate) fn from_unix_seconds(secs: i64) -> ArchiveResult<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| ArchiveError::corrupt(format!("timestamp {} out of range", secs)))
}

fn padded<const N: usize>(text: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let len = text.len().min(N);
    out[..len].copy_from_slice(&text[..len]);
    out
}

fn unpadded(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Global image header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Architecture code of the primary system partition, `00` if none
    pub arch: [u8; 3],
    /// Image identity
    pub id: ImageId,
    /// Creation time (unix seconds)
    pub created_at: i64,
    /// Last append time (unix seconds)
    pub modified_at: i64,
    /// Unused descriptor slots
    pub descriptors_free: i64,
    /// Descriptor table capacity
    pub descriptors_total: i64,
    /// Descriptor table offset
    pub descriptors_offset: i64,
    /// Descriptor table size in bytes
    pub descriptors_size: i64,
    /// Data section offset
    pub data_offset: i64,
    /// Bytes used in the data section
    pub data_size: i64,
}

impl Header {
    /// Header of a new, empty image
    pub fn new(id: ImageId, created_at: DateTime<Utc>, capacity: usize) -> Self {
        let descriptors_size = (capacity * DESCRIPTOR_SIZE) as i64;
        let data_offset = align_up(HEADER_SIZE as u64 + descriptors_size as u64, DATA_ALIGNMENT);
        let secs = unix_seconds(created_at);
        Self {
            arch: padded(UNKNOWN_ARCH_CODE.as_bytes()),
            id,
            created_at: secs,
            modified_at: secs,
            descriptors_free: capacity as i64,
            descriptors_total: capacity as i64,
            descriptors_offset: HEADER_SIZE as i64,
            descriptors_size,
            data_offset: data_offset as i64,
            data_size: 0,
        }
    }

    /// Architecture name recorded in the header
    pub fn arch_name(&self) -> &'static str {
        arch_name(&unpadded(&self.arch))
    }

    /// End of the used data section
    ///
    /// Only meaningful once [`Header::check`] has accepted the header.
    pub fn data_end(&self) -> u64 {
        self.data_offset.saturating_add(self.data_size) as u64
    }

    /// Write the header
    pub fn encode<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&padded::<LAUNCH_SCRIPT_LEN>(LAUNCH_SCRIPT))?;
        w.write_all(&MAGIC)?;
        w.write_all(&FORMAT_VERSION)?;
        w.write_all(&self.arch)?;
        w.write_all(self.id.as_bytes())?;
        w.write_i64::<LittleEndian>(self.created_at)?;
        w.write_i64::<LittleEndian>(self.modified_at)?;
        w.write_i64::<LittleEndian>(self.descriptors_free)?;
        w.write_i64::<LittleEndian>(self.descriptors_total)?;
        w.write_i64::<LittleEndian>(self.descriptors_offset)?;
        w.write_i64::<LittleEndian>(self.descriptors_size)?;
        w.write_i64::<LittleEndian>(self.data_offset)?;
        w.write_i64::<LittleEndian>(self.data_size)?;
        Ok(())
    }

    /// Header as bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        // Writing into a Vec cannot fail
        let _ = self.encode(&mut buf);
        buf
    }

    /// Read a header; `None` when the magic does not match
    pub fn decode<R: Read>(r: &mut R) -> ArchiveResult<Option<Self>> {
        let mut launch = [0u8; LAUNCH_SCRIPT_LEN];
        r.read_exact(&mut launch)?;
        let mut magic = [0u8; 10];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Ok(None);
        }
        let mut version = [0u8; 3];
        r.read_exact(&mut version)?;
        if version != FORMAT_VERSION {
            return Err(ArchiveError::UnsupportedVersion {
                version: unpadded(&version),
            });
        }
        let mut arch = [0u8; 3];
        r.read_exact(&mut arch)?;
        let mut id = [0u8; 16];
        r.read_exact(&mut id)?;

        Ok(Some(Self {
            arch,
            id: ImageId::from_bytes(id),
            created_at: r.read_i64::<LittleEndian>()?,
            modified_at: r.read_i64::<LittleEndian>()?,
            descriptors_free: r.read_i64::<LittleEndian>()?,
            descriptors_total: r.read_i64::<LittleEndian>()?,
            descriptors_offset: r.read_i64::<LittleEndian>()?,
            descriptors_size: r.read_i64::<LittleEndian>()?,
            data_offset: r.read_i64::<LittleEndian>()?,
            data_size: r.read_i64::<LittleEndian>()?,
        }))
    }

    /// Check internal consistency against the file length
    pub fn check(&self, file_len: u64) -> ArchiveResult<()> {
        let fields = [
            self.descriptors_free,
            self.descriptors_total,
            self.descriptors_offset,
            self.descriptors_size,
            self.data_offset,
            self.data_size,
        ];
        if fields.iter().any(|&v| v < 0) {
            return Err(ArchiveError::corrupt("negative header field"));
        }
        if self.descriptors_free > self.descriptors_total {
            return Err(ArchiveError::corrupt("more free descriptors than total"));
        }
        let table_size = self
            .descriptors_total
            .checked_mul(DESCRIPTOR_SIZE as i64)
            .ok_or_else(|| ArchiveError::corrupt("descriptor table size overflows"))?;
        if self.descriptors_size != table_size {
            return Err(ArchiveError::corrupt("descriptor table size mismatch"));
        }
        let table_end = self
            .descriptors_offset
            .checked_add(self.descriptors_size)
            .ok_or_else(|| ArchiveError::corrupt("descriptor table end overflows"))?;
        if self.descriptors_offset < HEADER_SIZE as i64 || table_end > self.data_offset {
            return Err(ArchiveError::corrupt("descriptor table overlaps data"));
        }
        let data_end = self
            .data_offset
            .checked_add(self.data_size)
            .ok_or_else(|| ArchiveError::corrupt("data section end overflows"))?;
        if data_end as u64 > file_len {
            return Err(ArchiveError::corrupt(format!(
                "data section ends at {} beyond file length {}",
                data_end, file_len
            )));
        }
        from_unix_seconds(self.created_at)?;
        from_unix_seconds(self.modified_at)?;
        Ok(())
    }
}

/// One descriptor table entry, as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDescriptor {
    /// Data type code
    pub data_type: i32,
    /// Slot in use
    pub used: bool,
    /// Object id
    pub id: u32,
    /// Group id
    pub group_id: u32,
    /// Linked object or group id
    pub linked_id: u32,
    /// Payload offset
    pub offset: i64,
    /// Payload length
    pub size: i64,
    /// Payload length including leading alignment padding
    pub size_with_padding: i64,
    /// Creation time (unix seconds)
    pub created_at: i64,
    /// Modification time (unix seconds)
    pub modified_at: i64,
    /// Owner uid
    pub uid: i64,
    /// Owner gid
    pub gid: i64,
    /// NUL padded name
    pub name: [u8; NAME_LEN],
    /// Type-specific data
    pub extra: [u8; EXTRA_LEN],
}

impl RawDescriptor {
    /// An unused slot
    pub fn empty() -> Self {
        Self {
            data_type: 0,
            used: false,
            id: 0,
            group_id: 0,
            linked_id: 0,
            offset: 0,
            size: 0,
            size_with_padding: 0,
            created_at: 0,
            modified_at: 0,
            uid: 0,
            gid: 0,
            name: [0u8; NAME_LEN],
            extra: [0u8; EXTRA_LEN],
        }
    }

    /// Set the name field
    pub fn set_name(&mut self, name: &str) {
        self.name = padded(name.as_bytes());
    }

    /// Store partition metadata in the extra field
    pub fn set_partition(&mut self, info: &PartitionInfo) {
        let mut extra = Vec::with_capacity(11);
        extra.extend_from_slice(&info.fs.code().to_le_bytes());
        extra.extend_from_slice(&info.part.code().to_le_bytes());
        extra.extend_from_slice(&padded::<3>(arch_code(&info.arch).as_bytes()));
        self.extra = padded(&extra);
    }

    /// Partition metadata from the extra field
    pub fn partition(&self) -> Option<PartitionInfo> {
        if DataType::from_code(self.data_type) != DataType::Partition {
            return None;
        }
        let mut extra = &self.extra[..];
        let fs = extra.read_i32::<LittleEndian>().ok()?;
        let part = extra.read_i32::<LittleEndian>().ok()?;
        let arch = unpadded(&extra[..3]);
        Some(PartitionInfo {
            fs: FsType::from_code(fs),
            part: PartType::from_code(part),
            arch: arch_name(&arch).to_string(),
        })
    }

    /// Public view of this entry
    pub fn to_descriptor(&self) -> ArchiveResult<Descriptor> {
        if self.offset < 0 || self.size < 0 {
            return Err(ArchiveError::corrupt(format!(
                "descriptor {} has negative extent",
                self.id
            )));
        }
        Ok(Descriptor {
            id: self.id,
            data_type: DataType::from_code(self.data_type),
            name: unpadded(&self.name),
            offset: self.offset as u64,
            size: self.size as u64,
            created_at: from_unix_seconds(self.created_at)?,
            partition: self.partition(),
        })
    }

    /// Write the entry
    pub fn encode<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_i32::<LittleEndian>(self.data_type)?;
        w.write_u8(u8::from(self.used))?;
        w.write_u32::<LittleEndian>(self.id)?;
        w.write_u32::<LittleEndian>(self.group_id)?;
        w.write_u32::<LittleEndian>(self.linked_id)?;
        w.write_i64::<LittleEndian>(self.offset)?;
        w.write_i64::<LittleEndian>(self.size)?;
        w.write_i64::<LittleEndian>(self.size_with_padding)?;
        w.write_i64::<LittleEndian>(self.created_at)?;
        w.write_i64::<LittleEndian>(self.modified_at)?;
        w.write_i64::<LittleEndian>(self.uid)?;
        w.write_i64::<LittleEndian>(self.gid)?;
        w.write_all(&self.name)?;
        w.write_all(&self.extra)?;
        Ok(())
    }

    /// Entry as bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(DESCRIPTOR_SIZE);
        let _ = self.encode(&mut buf);
        buf
    }

    /// Read an entry
    pub fn decode<R: Read>(r: &mut R) -> std::io::Result<Self> {
        let data_type = r.read_i32::<LittleEndian>()?;
        let used = r.read_u8()? != 0;
        let id = r.read_u32::<LittleEndian>()?;
        let group_id = r.read_u32::<LittleEndian>()?;
        let linked_id = r.read_u32::<LittleEndian>()?;
        let offset = r.read_i64::<LittleEndian>()?;
        let size = r.read_i64::<LittleEndian>()?;
        let size_with_padding = r.read_i64::<LittleEndian>()?;
        let created_at = r.read_i64::<LittleEndian>()?;
        let modified_at = r.read_i64::<LittleEndian>()?;
        let uid = r.read_i64::<LittleEndian>()?;
        let gid = r.read_i64::<LittleEndian>()?;
        let mut name = [0u8; NAME_LEN];
        r.read_exact(&mut name)?;
        let mut extra = [0u8; EXTRA_LEN];
        r.read_exact(&mut extra)?;
        Ok(Self {
            data_type,
            used,
            id,
            group_id,
            linked_id,
            offset,
            size,
            size_with_padding,
            created_at,
            modified_at,
            uid,
            gid,
            name,
            extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_size() {
        let header = Header::new(ImageId::mint(), Utc::now(), DEFAULT_DESCRIPTOR_CAPACITY);
        assert_eq!(header.to_bytes().len(), HEADER_SIZE);
        assert_eq!(&header.to_bytes()[32..42], b"SIF_MAGIC\0");
    }

    #[test]
    fn test_descriptor_size() {
        assert_eq!(RawDescriptor::empty().to_bytes().len(), DESCRIPTOR_SIZE);
    }

    #[test]
    fn test_new_header_layout() {
        let header = Header::new(ImageId::mint(), Utc::now(), DEFAULT_DESCRIPTOR_CAPACITY);
        assert_eq!(header.descriptors_offset, 128);
        assert_eq!(header.descriptors_size, 48 * 585);
        assert_eq!(header.data_offset % DATA_ALIGNMENT as i64, 0);
        assert!(header.data_offset >= 128 + 48 * 585);
        assert_eq!(header.data_size, 0);
        assert_eq!(header.arch_name(), "unknown");
    }

    #[test]
    fn test_header_decode() {
        let header = Header::new(ImageId::mint(), Utc::now(), 4);
        let decoded = Header::decode(&mut Cursor::new(header.to_bytes()))
            .unwrap()
            .unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_bad_magic() {
        let mut bytes = Header::new(ImageId::mint(), Utc::now(), 4).to_bytes();
        bytes[32] = b'X';
        assert!(Header::decode(&mut Cursor::new(bytes)).unwrap().is_none());
    }

    #[test]
    fn test_header_bad_version() {
        let mut bytes = Header::new(ImageId::mint(), Utc::now(), 4).to_bytes();
        bytes[42] = b'9';
        assert!(matches!(
            Header::decode(&mut Cursor::new(bytes)),
            Err(ArchiveError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_header_check_rejects_truncation() {
        let mut header = Header::new(ImageId::mint(), Utc::now(), 4);
        header.data_size = 100;
        assert!(header.check(header.data_offset as u64).is_err());
        assert!(header.check(header.data_offset as u64 + 100).is_ok());
    }

    #[test]
    fn test_header_check_rejects_overflowing_fields() {
        let base = Header::new(ImageId::mint(), Utc::now(), 4);
        let file_len = base.data_offset as u64;

        let mut header = base.clone();
        header.descriptors_total = i64::MAX / 2;
        header.descriptors_free = 0;
        assert!(matches!(header.check(file_len), Err(ArchiveError::Corrupt(_))));

        let mut header = base.clone();
        header.data_size = i64::MAX;
        assert!(matches!(header.check(file_len), Err(ArchiveError::Corrupt(_))));

        let mut header = base.clone();
        header.descriptors_offset = i64::MAX - 8;
        assert!(matches!(header.check(file_len), Err(ArchiveError::Corrupt(_))));
    }

    #[test]
    fn test_header_check_rejects_bad_timestamps() {
        let base = Header::new(ImageId::mint(), Utc::now(), 4);
        let file_len = base.data_offset as u64;

        let mut header = base.clone();
        header.created_at = i64::MAX;
        assert!(matches!(header.check(file_len), Err(ArchiveError::Corrupt(_))));

        let mut header = base;
        header.modified_at = i64::MIN;
        assert!(matches!(header.check(file_len), Err(ArchiveError::Corrupt(_))));
    }

    #[test]
    fn test_partition_extra() {
        let mut raw = RawDescriptor::empty();
        raw.data_type = DataType::Partition.code();
        raw.set_partition(&PartitionInfo::ext3_data("amd64"));
        assert_eq!(&raw.extra[..8], &[2, 0, 0, 0, 3, 0, 0, 0]);
        assert_eq!(&raw.extra[8..11], b"02\0");

        let decoded = RawDescriptor::decode(&mut Cursor::new(raw.to_bytes())).unwrap();
        assert_eq!(decoded.partition(), Some(PartitionInfo::ext3_data("amd64")));
    }

    #[test]
    fn test_name_padding() {
        let mut raw = RawDescriptor::empty();
        raw.set_name("metadata");
        raw.data_type = DataType::GenericJson.code();
        let descriptor = raw.to_descriptor().unwrap();
        assert_eq!(descriptor.name, "metadata");
        assert_eq!(descriptor.partition, None);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 4096), 0);
        assert_eq!(align_up(1, 4096), 4096);
        assert_eq!(align_up(4096, 4096), 4096);
        assert_eq!(align_up(13, 1), 13);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_align_up_is_smallest_aligned_bound(value in 0u64..(1 << 40), shift in 0u32..16) {
                let align = 1u64 << shift;
                let aligned = align_up(value, align);
                prop_assert!(aligned >= value);
                prop_assert_eq!(aligned % align, 0);
                prop_assert!(aligned - value < align);
            }
        }
    }
}
