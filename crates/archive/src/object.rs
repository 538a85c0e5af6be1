//! Typed objects stored in an image
//!
//! Each object has a data type, a name and a payload. Partition objects also
//! carry a filesystem type, a partition type and a CPU architecture.

use crate::error::{ArchiveError, ArchiveResult};
use chrono::{DateTime, Utc};

/// Longest object name; the on-disk field is 128 bytes, NUL padded
pub const MAX_OBJECT_NAME_LEN: usize = 127;

/// Object data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Definition file the image was built from
    DefFile,
    /// Environment variables
    EnvVar,
    /// Labels
    Labels,
    /// Filesystem partition
    Partition,
    /// Signature
    Signature,
    /// Arbitrary JSON
    GenericJson,
    /// Arbitrary bytes
    Generic,
    /// Any other type code written by another tool
    Other(i32),
}

impl DataType {
    /// On-disk type code
    pub fn code(&self) -> i32 {
        match self {
            DataType::DefFile => 0x4001,
            DataType::EnvVar => 0x4002,
            DataType::Labels => 0x4003,
            DataType::Partition => 0x4004,
            DataType::Signature => 0x4005,
            DataType::GenericJson => 0x4006,
            DataType::Generic => 0x4007,
            DataType::Other(code) => *code,
        }
    }

    /// Decode an on-disk type code
    pub fn from_code(code: i32) -> Self {
        match code {
            0x4001 => DataType::DefFile,
            0x4002 => DataType::EnvVar,
            0x4003 => DataType::Labels,
            0x4004 => DataType::Partition,
            0x4005 => DataType::Signature,
            0x4006 => DataType::GenericJson,
            0x4007 => DataType::Generic,
            other => DataType::Other(other),
        }
    }

    /// Human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::DefFile => "Def.FILE",
            DataType::EnvVar => "Env.Vars",
            DataType::Labels => "JSON.Labels",
            DataType::Partition => "FS",
            DataType::Signature => "Signature",
            DataType::GenericJson => "JSON.Generic",
            DataType::Generic => "Generic/Raw",
            DataType::Other(_) => "Unknown",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Filesystem held by a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsType {
    /// SquashFS
    Squash,
    /// ext3
    Ext3,
    /// Immutable object
    ImmutableObject,
    /// Raw bytes
    Raw,
    /// Any other code
    Other(i32),
}

impl FsType {
    /// On-disk code
    pub fn code(&self) -> i32 {
        match self {
            FsType::Squash => 1,
            FsType::Ext3 => 2,
            FsType::ImmutableObject => 3,
            FsType::Raw => 4,
            FsType::Other(code) => *code,
        }
    }

    /// Decode an on-disk code
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => FsType::Squash,
            2 => FsType::Ext3,
            3 => FsType::ImmutableObject,
            4 => FsType::Raw,
            other => FsType::Other(other),
        }
    }
}

/// Role of a partition inside its image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartType {
    /// System partition
    System,
    /// Primary system partition (the root filesystem)
    PrimarySystem,
    /// Data partition
    Data,
    /// Overlay partition
    Overlay,
    /// Any other code
    Other(i32),
}

impl PartType {
    /// On-disk code
    pub fn code(&self) -> i32 {
        match self {
            PartType::System => 1,
            PartType::PrimarySystem => 2,
            PartType::Data => 3,
            PartType::Overlay => 4,
            PartType::Other(code) => *code,
        }
    }

    /// Decode an on-disk code
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => PartType::System,
            2 => PartType::PrimarySystem,
            3 => PartType::Data,
            4 => PartType::Overlay,
            other => PartType::Other(other),
        }
    }
}

// Architecture names (GOARCH spelling) and their two-digit header codes.
const ARCH_CODES: &[(&str, &str)] = &[
    ("386", "01"),
    ("amd64", "02"),
    ("arm", "03"),
    ("arm64", "04"),
    ("ppc64", "05"),
    ("ppc64le", "06"),
    ("mips", "07"),
    ("mipsle", "08"),
    ("mips64", "09"),
    ("mips64le", "10"),
    ("s390x", "11"),
    ("riscv64", "12"),
];

/// Code used for an architecture that is not in the table
pub const UNKNOWN_ARCH_CODE: &str = "00";

/// Two-digit header code of an architecture name
pub fn arch_code(arch: &str) -> &'static str {
    ARCH_CODES
        .iter()
        .find(|(name, _)| *name == arch)
        .map(|(_, code)| *code)
        .unwrap_or(UNKNOWN_ARCH_CODE)
}

/// Architecture name of a two-digit header code
pub fn arch_name(code: &str) -> &'static str {
    ARCH_CODES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(name, _)| *name)
        .unwrap_or("unknown")
}

/// Partition metadata stored in a descriptor's extra field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionInfo {
    /// Filesystem type
    pub fs: FsType,
    /// Partition type
    pub part: PartType,
    /// Architecture name, e.g. `amd64`
    pub arch: String,
}

impl PartitionInfo {
    /// ext3 data partition, as built for input and output containers
    pub fn ext3_data(arch: impl Into<String>) -> Self {
        Self {
            fs: FsType::Ext3,
            part: PartType::Data,
            arch: arch.into(),
        }
    }
}

/// An object to be written into an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInput {
    /// Data type
    pub data_type: DataType,
    /// Object name
    pub name: String,
    /// Payload
    pub data: Vec<u8>,
    /// Partition metadata, required for partitions
    pub partition: Option<PartitionInfo>,
    /// Payload alignment within the data section
    pub alignment: u64,
}

/// Alignment of partition payloads
pub const PARTITION_ALIGNMENT: u64 = 4096;

impl ObjectInput {
    /// Partition object
    pub fn partition(name: impl Into<String>, data: Vec<u8>, info: PartitionInfo) -> Self {
        Self {
            data_type: DataType::Partition,
            name: name.into(),
            data,
            partition: Some(info),
            alignment: PARTITION_ALIGNMENT,
        }
    }

    /// Generic JSON object
    pub fn generic_json(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            data_type: DataType::GenericJson,
            name: name.into(),
            data,
            partition: None,
            alignment: 1,
        }
    }

    /// Definition file object
    pub fn def_file(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            data_type: DataType::DefFile,
            name: name.into(),
            data,
            partition: None,
            alignment: 1,
        }
    }

    /// Check the object can be encoded
    pub fn validate(&self) -> ArchiveResult<()> {
        if self.name.len() > MAX_OBJECT_NAME_LEN {
            return Err(ArchiveError::invalid_object(format!(
                "name {:?} is longer than {} bytes",
                self.name, MAX_OBJECT_NAME_LEN
            )));
        }
        if self.name.contains('\0') {
            return Err(ArchiveError::invalid_object("name contains NUL"));
        }
        if self.alignment == 0 {
            return Err(ArchiveError::invalid_object("alignment must be non-zero"));
        }
        match (self.data_type, &self.partition) {
            (DataType::Partition, None) => Err(ArchiveError::invalid_object(format!(
                "partition {:?} has no partition metadata",
                self.name
            ))),
            (DataType::Partition, Some(_)) | (_, None) => Ok(()),
            (_, Some(_)) => Err(ArchiveError::invalid_object(format!(
                "{} object {:?} carries partition metadata",
                self.data_type, self.name
            ))),
        }
    }
}

/// Decoded descriptor of an object stored in an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Object id, unique within the image, starting at 1
    pub id: u32,
    /// Data type
    pub data_type: DataType,
    /// Object name
    pub name: String,
    /// Absolute payload offset in the file
    pub offset: u64,
    /// Payload length
    pub size: u64,
    /// When the object was written
    pub created_at: DateTime<Utc>,
    /// Partition metadata for partitions
    pub partition: Option<PartitionInfo>,
}

/// An object read back from an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    /// Where and what it is
    pub descriptor: Descriptor,
    /// Payload
    pub data: Vec<u8>,
}
