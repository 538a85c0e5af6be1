//! Runtime settings
//!
//! Settings come from an optional TOML file (`tric.toml` by default):
//!
//! ```toml
//! image_dir = "images"
//! architecture = "amd64"
//!
//! [tools]
//! apptainer = "/usr/local/bin/apptainer"
//! mkfs = "mkfs.ext3"
//! tune2fs = "tune2fs"
//!
//! [web]
//! listen = "127.0.0.1:5000"
//! ```
//!
//! Every key is optional; unknown keys are rejected.

use crate::error::ConfigResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default settings file looked up in the current directory
pub const DEFAULT_SETTINGS_FILE: &str = "tric.toml";

/// External programs the pipeline invokes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolSettings {
    /// Container runtime used for `build` and `run`
    pub apptainer: String,
    /// ext3 filesystem creator
    pub mkfs: String,
    /// ext2/3/4 tuner
    pub tune2fs: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            apptainer: "apptainer".to_string(),
            mkfs: "mkfs.ext3".to_string(),
            tune2fs: "tune2fs".to_string(),
        }
    }
}

/// Web form settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebSettings {
    /// Listen address of the form server
    pub listen: String,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:5000".to_string(),
        }
    }
}

/// Complete runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Where images are written and where the workflow runs
    pub image_dir: PathBuf,
    /// Parent of transient staging directories and raw filesystem files;
    /// defaults to `image_dir`
    pub work_dir: Option<PathBuf>,
    /// CPU architecture recorded on data partitions
    pub architecture: String,
    /// External programs
    pub tools: ToolSettings,
    /// Web form
    pub web: WebSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("."),
            work_dir: None,
            architecture: "amd64".to_string(),
            tools: ToolSettings::default(),
            web: WebSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load settings from a file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&text)
    }

    /// Load `path` if given, else [`DEFAULT_SETTINGS_FILE`] if present, else defaults
    pub fn discover(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_SETTINGS_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Effective staging parent directory
    pub fn work_dir(&self) -> &Path {
        self.work_dir.as_deref().unwrap_or(&self.image_dir)
    }
}
