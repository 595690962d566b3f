//! Configuration module

use crate::hash::DefaultHashEngine;
use crate::{Error, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Archive writing behaviour
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// ZIP codec settings
    #[serde(default)]
    pub zip: ZipConfig,
    /// Hash engine settings
    #[serde(default)]
    pub hashing: HashingConfig,
}

/// Archive writing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Replace existing destinations instead of failing with status 1
    #[serde(default)]
    pub overwrite: bool,
}

/// Compression method for ZIP entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZipCompression {
    #[default]
    Deflated,
    Stored,
}

/// ZIP codec configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZipConfig {
    #[serde(default)]
    pub compression: ZipCompression,
    /// Compression level, codec default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i64>,
}

/// Hashing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashingConfig {
    /// Read buffer in KiB
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_buffer_size() -> usize {
    64
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
        }
    }
}

impl HashingConfig {
    /// Hash engine using the configured buffer
    pub fn engine(&self) -> DefaultHashEngine {
        DefaultHashEngine::with_buffer_size(self.buffer_size.saturating_mul(1024))
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir().ok_or_else(|| {
            Error::Config("Unable to determine config directory".to_string())
        })?;

        let archivist_dir = config_dir.join("archivist");
        if !archivist_dir.exists() {
            fs::create_dir_all(&archivist_dir)?;
        }

        Ok(archivist_dir.join("config.toml"))
    }

    /// Get default configuration content with comments
    pub fn default_config_content() -> String {
        r#"# Archivist Configuration File

[archive]
# Replace existing archives and extracted files
overwrite = false

[zip]
# Compression method for ZIP entries: deflated, stored
compression = "deflated"
# Compression level (codec default when unset)
# level = 6

[hashing]
# Read buffer size in KiB
buffer_size = 64
"#
        .to_string()
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from the default location, writing the default
    /// file when none exists yet
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            fs::write(&path, Self::default_config_content())?;
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path.as_ref(), contents)?;
        Ok(())
    }

    /// Load configuration or use defaults if loading fails
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
