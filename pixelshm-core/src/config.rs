// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict validation.
//!
//! Backend and frontend read the same file so they agree on the segment name
//! and resolution. Any invalid field results in a HardValidationError before
//! a segment is touched.

use std::path::Path;

use serde::Deserialize;

use crate::error::{CanvasError, CanvasResult, HardValidationError};
use crate::shm::{StatsLayout, DEFAULT_MAX_PORTS, DEFAULT_RECORD_SIZE};
use crate::types::{Resolution, SegmentName};

/// Raw canvas section as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawCanvasConfig {
    #[serde(default = "default_name")]
    name: String,
    width: Option<u16>,
    height: Option<u16>,
}

fn default_name() -> String {
    "/pixelflut".to_string()
}

impl Default for RawCanvasConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            width: None,
            height: None,
        }
    }
}

/// Raw statistics section.
#[derive(Debug, Deserialize)]
struct RawStatsConfig {
    #[serde(default = "default_max_ports")]
    max_ports: usize,
    #[serde(default = "default_record_size")]
    record_size: usize,
}

fn default_max_ports() -> usize {
    DEFAULT_MAX_PORTS
}

fn default_record_size() -> usize {
    DEFAULT_RECORD_SIZE
}

impl Default for RawStatsConfig {
    fn default() -> Self {
        Self {
            max_ports: default_max_ports(),
            record_size: default_record_size(),
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    canvas: RawCanvasConfig,
    #[serde(default)]
    statistics: RawStatsConfig,
}

/// Values given on the command line, taking precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub name: Option<String>,
    pub width: Option<u16>,
    pub height: Option<u16>,
}

/// Complete validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasConfig {
    pub name: SegmentName,
    pub resolution: Resolution,
    pub stats: StatsLayout,
}

/// Segment name and statistics layout: enough to attach to a running canvas
/// whose resolution is read from its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachConfig {
    pub name: SegmentName,
    pub stats: StatsLayout,
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> CanvasResult<CanvasConfig> {
        Self::load_file_with(path, &ConfigOverrides::default())
    }

    /// Load a YAML file and apply command line overrides before validating.
    pub fn load_file_with(
        path: impl AsRef<Path>,
        overrides: &ConfigOverrides,
    ) -> CanvasResult<CanvasConfig> {
        let raw = Self::read_file(path.as_ref())?;
        Self::validate(raw, overrides)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> CanvasResult<CanvasConfig> {
        Self::validate(Self::parse(content)?, &ConfigOverrides::default())
    }

    /// Build a configuration from overrides alone, using defaults elsewhere.
    pub fn from_overrides(overrides: &ConfigOverrides) -> CanvasResult<CanvasConfig> {
        Self::validate(RawConfig::default(), overrides)
    }

    /// Load the optional file, apply overrides and validate everything
    /// needed to create a canvas.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> CanvasResult<CanvasConfig> {
        let raw = match path {
            Some(path) => Self::read_file(path)?,
            None => RawConfig::default(),
        };
        Self::validate(raw, overrides)
    }

    /// Like [`ConfigLoader::load`], but width and height may be absent.
    pub fn load_attach(
        path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> CanvasResult<AttachConfig> {
        let raw = match path {
            Some(path) => Self::read_file(path)?,
            None => RawConfig::default(),
        };
        let name = SegmentName::new(overrides.name.clone().unwrap_or(raw.canvas.name))?;
        let stats = StatsLayout::new(raw.statistics.max_ports, raw.statistics.record_size)?;
        Ok(AttachConfig { name, stats })
    }

    fn read_file(path: &Path) -> CanvasResult<RawConfig> {
        if !path.exists() {
            return Err(CanvasError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CanvasError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::parse(&content)
    }

    fn parse(content: &str) -> CanvasResult<RawConfig> {
        // An empty document is a valid, all-defaults configuration.
        if content.trim().is_empty() {
            return Ok(RawConfig::default());
        }

        serde_yaml::from_str(content).map_err(|e| CanvasError::ConfigParse {
            message: format!("YAML parse error: {}", e),
        })
    }

    /// Validate raw configuration and convert to validated types.
    fn validate(raw: RawConfig, overrides: &ConfigOverrides) -> CanvasResult<CanvasConfig> {
        let name = SegmentName::new(overrides.name.clone().unwrap_or(raw.canvas.name))?;

        let width = overrides.width.or(raw.canvas.width).ok_or_else(|| {
            HardValidationError::MissingRequiredField {
                field: "width",
                context: "canvas".to_string(),
            }
        })?;
        let height = overrides.height.or(raw.canvas.height).ok_or_else(|| {
            HardValidationError::MissingRequiredField {
                field: "height",
                context: "canvas".to_string(),
            }
        })?;
        let resolution = Resolution::new(width, height)?;

        let stats = StatsLayout::new(raw.statistics.max_ports, raw.statistics.record_size)?;

        Ok(CanvasConfig {
            name,
            resolution,
            stats,
        })
    }
}
