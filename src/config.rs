//! Layout configuration, optionally loaded from a TOML file.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Which collection each node takes its color from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorBy {
    /// One color per track.
    #[default]
    Tracks,
    /// One color per lineage.
    Lineages,
}

impl FromStr for ColorBy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tracks" => Ok(ColorBy::Tracks),
            "lineages" => Ok(ColorBy::Lineages),
            other => Err(ConfigError::InvalidValue {
                key: "color_by",
                value: other.to_string(),
            }),
        }
    }
}

/// Options for the recompute pipeline and snapshot export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Initial cursor value for offset assignment.
    pub start_at: i64,
    /// Color nodes by track or by lineage.
    pub color_by: ColorBy,
    /// Omit isolated nodes from exported snapshots.
    pub exclude_isolated: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            start_at: 0,
            color_by: ColorBy::Tracks,
            exclude_isolated: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    layout: RawLayout,
}

#[derive(Debug, Default, Deserialize)]
struct RawLayout {
    start_at: Option<i64>,
    color_by: Option<String>,
    exclude_isolated: Option<bool>,
}

/// Failure to read or interpret a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// A key holds a value outside its domain.
    #[error("config value '{value}' is invalid for '{key}'")]
    InvalidValue {
        /// Offending key.
        key: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Default location of the configuration file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("lineage-forest").join("config.toml"))
}

/// Loads layout options from `explicit`, or from [`default_config_path`] when
/// no path is given. A missing file yields the defaults.
pub fn load_options(explicit: Option<PathBuf>) -> Result<LayoutOptions, ConfigError> {
    match explicit.or_else(default_config_path) {
        Some(path) if path.exists() => read_file(&path),
        _ => Ok(LayoutOptions::default()),
    }
}

fn read_file(path: &Path) -> Result<LayoutOptions, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let options = convert(raw.layout)?;
    debug!(path = %path.display(), ?options, "config.loaded");
    Ok(options)
}

fn convert(raw: RawLayout) -> Result<LayoutOptions, ConfigError> {
    let defaults = LayoutOptions::default();
    let color_by = match raw.color_by.as_deref() {
        Some(value) => value.parse()?,
        None => defaults.color_by,
    };
    Ok(LayoutOptions {
        start_at: raw.start_at.unwrap_or(defaults.start_at),
        color_by,
        exclude_isolated: raw.exclude_isolated.unwrap_or(defaults.exclude_isolated),
    })
}
