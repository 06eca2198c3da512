// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

use std::path::Path;

use pixelshm_core::{AttachConfig, CanvasConfig, CanvasResult, ConfigLoader, ConfigOverrides};
use thiserror::Error;

pub mod create;
pub mod info;
pub mod pixel;
pub mod ports;
pub mod remove;
pub mod watch;

/// Which canvas a command works on: optional config file plus name override.
pub struct Target {
    pub config: Option<String>,
    pub name: Option<String>,
}

impl Target {
    fn overrides(&self, width: Option<u16>, height: Option<u16>) -> ConfigOverrides {
        ConfigOverrides {
            name: self.name.clone(),
            width,
            height,
        }
    }

    /// Full configuration, needed to create a canvas.
    pub fn canvas_config(&self, width: Option<u16>, height: Option<u16>) -> CanvasResult<CanvasConfig> {
        ConfigLoader::load(self.config.as_deref().map(Path::new), &self.overrides(width, height))
    }

    /// Name and statistics layout, enough to attach to a running canvas.
    pub fn attach_config(&self) -> CanvasResult<AttachConfig> {
        ConfigLoader::load_attach(self.config.as_deref().map(Path::new), &self.overrides(None, None))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("expected 6 (RRGGBB) or 8 (RRGGBBAA) hex digits, got {0}")]
    Length(usize),

    #[error("invalid hex color: {0}")]
    Digits(String),
}

/// Parse a Pixelflut color. `RRGGBB` is stored fully opaque as `0xRRGGBBFF`.
pub fn parse_rgba(s: &str) -> Result<u32, ColorParseError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix('#'))
        .unwrap_or(s);

    let value = u32::from_str_radix(digits, 16).map_err(|_| ColorParseError::Digits(s.to_string()))?;
    match digits.len() {
        6 => Ok(value << 8 | 0xFF),
        8 => Ok(value),
        n => Err(ColorParseError::Length(n)),
    }
}
