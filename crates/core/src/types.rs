//! Core types for TRIC workflows
//!
//! This module defines the fundamental types used throughout the system:
//! - [`ImageId`]: Identity of one built container image
//! - [`ContainerRole`]: The part an image plays in a workflow

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Identity of a container image
///
/// An ImageId is minted exactly once, by the archive format, when the image
/// file is created. Callers never choose it. Anything that needs the identity
/// of an image after creation reads it back from the image header:
/// - Record trails embedded in output images
/// - Metadata objects embedded at build time
/// - Inspection output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(Uuid);

impl ImageId {
    /// Mint a new random ImageId using UUID v4
    ///
    /// Only the archive layer calls this, at creation time.
    ///
    /// # Examples
    ///
    /// ```
    /// use tric_core::types::ImageId;
    ///
    /// let id1 = ImageId::mint();
    /// let id2 = ImageId::mint();
    /// assert_ne!(id1, id2);
    /// ```
    pub fn mint() -> Self {
        ImageId(Uuid::new_v4())
    }

    /// Create ImageId from the raw header bytes
    ///
    /// # Examples
    ///
    /// ```
    /// use tric_core::types::ImageId;
    ///
    /// let id = ImageId::mint();
    /// let restored = ImageId::from_bytes(*id.as_bytes());
    /// assert_eq!(id, restored);
    /// ```
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        ImageId(Uuid::from_bytes(bytes))
    }

    /// Get raw bytes representation
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Check for the all-zero identity, which no created image carries
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for ImageId {
    fn from(uuid: Uuid) -> Self {
        ImageId(uuid)
    }
}

impl FromStr for ImageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(ImageId)
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The part a container image plays in a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerRole {
    /// The image whose run-script is executed
    Application,
    /// A data image bound read-only into the application
    Input,
    /// The image that receives results and the record trail
    Output,
}

impl ContainerRole {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerRole::Application => "application",
            ContainerRole::Input => "input",
            ContainerRole::Output => "output",
        }
    }
}

impl std::fmt::Display for ContainerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
