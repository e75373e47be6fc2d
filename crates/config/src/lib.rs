#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for conpack
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/conpack/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

use conpack_errors::{ConfigError, Error};
use conpack_types::{DEFAULT_SIMPLE_PLATFORM, INDEX_FILE_NAME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub consolidation: ConsolidationConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

/// How packages are read and the archive is assembled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    /// Folder inside a container package that holds per-platform archives
    #[serde(default = "default_tools_folder")]
    pub tools_folder: String,
    /// Platform tag assigned to single-payload packages
    #[serde(default = "default_simple_platform")]
    pub simple_platform: String,
    /// Abort the run when any package fails to read (otherwise skip it)
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,
    /// Remove superseded consolidated archives after publishing
    #[serde(default = "default_prune_stale")]
    pub prune_stale: bool,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(default)]
    pub compression: Compression,
}

/// Compression applied to blob entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Deflated,
    Stored,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Root for scratch extraction directories (system temp dir when unset)
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            tools_folder: default_tools_folder(),
            simple_platform: default_simple_platform(),
            fail_fast: default_fail_fast(),
            prune_stale: default_prune_stale(),
            index_name: default_index_name(),
            compression: Compression::default(),
        }
    }
}

// Default value functions for serde
fn default_tools_folder() -> String {
    "tools".to_string()
}

fn default_simple_platform() -> String {
    DEFAULT_SIMPLE_PLATFORM.to_string()
}

fn default_fail_fast() -> bool {
    true
}

fn default_prune_stale() -> bool {
    true
}

fn default_index_name() -> String {
    INDEX_FILE_NAME.to_string()
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("conpack").join("config.toml"))
    }

    /// Parse configuration from TOML text and validate it
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        Self::from_toml(&contents)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let Ok(config_path) = Self::default_path() else {
            return Ok(Self::default());
        };

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // CONPACK_TOOLS_FOLDER
        if let Ok(folder) = std::env::var("CONPACK_TOOLS_FOLDER") {
            self.consolidation.tools_folder = folder;
        }

        // CONPACK_SIMPLE_PLATFORM
        if let Ok(platform) = std::env::var("CONPACK_SIMPLE_PLATFORM") {
            self.consolidation.simple_platform = platform;
        }

        // CONPACK_FAIL_FAST
        if let Ok(value) = std::env::var("CONPACK_FAIL_FAST") {
            self.consolidation.fail_fast = parse_bool("CONPACK_FAIL_FAST", value)?;
        }

        // CONPACK_PRUNE_STALE
        if let Ok(value) = std::env::var("CONPACK_PRUNE_STALE") {
            self.consolidation.prune_stale = parse_bool("CONPACK_PRUNE_STALE", value)?;
        }

        // CONPACK_COMPRESSION
        if let Ok(value) = std::env::var("CONPACK_COMPRESSION") {
            self.consolidation.compression = match value.as_str() {
                "deflated" => Compression::Deflated,
                "stored" => Compression::Stored,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "CONPACK_COMPRESSION".to_string(),
                        value,
                    }
                    .into())
                }
            };
        }

        self.validate()
    }

    /// Reject values that would produce unusable archive paths
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending field.
    pub fn validate(&self) -> Result<(), Error> {
        let c = &self.consolidation;
        for (field, value) in [
            ("tools_folder", &c.tools_folder),
            ("simple_platform", &c.simple_platform),
            ("index_name", &c.index_name),
        ] {
            if value.is_empty() || value.contains('/') || value.contains('\\') {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Scratch root for extraction (with default)
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.paths
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

fn parse_bool(field: &str, value: String) -> Result<bool, Error> {
    match value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()),
    }
}
