// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Byte layout of a canvas segment.
//!
//! ```text
//! 0                 4                          4 + W*H*4
//! +--------+--------+--------------------------+-------------------------------+
//! | width  | height | pixels (u32 RGBA, W*H)   | port stats (max_ports slots)  |
//! +--------+--------+--------------------------+-------------------------------+
//! ```
//!
//! Native endianness, no magic, no version. Other processes attach to the
//! same segment and must agree on these offsets exactly.

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;
use crate::types::Resolution;

/// Header size in bytes (width + height as u16).
pub const HEADER_SIZE: usize = 2 * std::mem::size_of::<u16>();

/// Bytes per pixel (one RGBA u32).
pub const PIXEL_SIZE: usize = std::mem::size_of::<u32>();

/// Default number of statistics slots.
pub const DEFAULT_MAX_PORTS: usize = 32;

/// Default size of one statistics record in bytes.
pub const DEFAULT_RECORD_SIZE: usize = 64;

/// Shape of the statistics table: `max_ports` opaque records of `record_size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStatsLayout")]
pub struct StatsLayout {
    max_ports: usize,
    record_size: usize,
}

#[derive(Deserialize)]
struct RawStatsLayout {
    max_ports: usize,
    record_size: usize,
}

impl TryFrom<RawStatsLayout> for StatsLayout {
    type Error = HardValidationError;

    fn try_from(raw: RawStatsLayout) -> Result<Self, Self::Error> {
        Self::new(raw.max_ports, raw.record_size)
    }
}

impl StatsLayout {
    /// Create a new StatsLayout with validation.
    pub fn new(max_ports: usize, record_size: usize) -> Result<Self, HardValidationError> {
        if max_ports == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "max_ports",
                value: "0".to_string(),
                reason: "At least one port slot is required".to_string(),
            });
        }
        if record_size == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "record_size",
                value: "0".to_string(),
                reason: "Record size must be greater than 0".to_string(),
            });
        }
        Ok(Self {
            max_ports,
            record_size,
        })
    }

    pub fn max_ports(&self) -> usize {
        self.max_ports
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }
}

impl Default for StatsLayout {
    fn default() -> Self {
        Self {
            max_ports: DEFAULT_MAX_PORTS,
            record_size: DEFAULT_RECORD_SIZE,
        }
    }
}

/// Validated offsets of the three sub-regions of a segment.
///
/// Computed once at attach time; all views into the mapping go through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasLayout {
    resolution: Resolution,
    stats: StatsLayout,
    pixels_len: usize,
    stats_len: usize,
    total_size: usize,
}

impl CanvasLayout {
    /// Compute the layout, rejecting sizes that overflow `usize`.
    pub fn new(resolution: Resolution, stats: StatsLayout) -> Result<Self, HardValidationError> {
        let overflow = || HardValidationError::LayoutOverflow {
            width: resolution.width(),
            height: resolution.height(),
            max_ports: stats.max_ports(),
            record_size: stats.record_size(),
        };

        let pixels_len = resolution
            .pixel_count()
            .checked_mul(PIXEL_SIZE)
            .ok_or_else(overflow)?;
        let stats_len = stats
            .max_ports()
            .checked_mul(stats.record_size())
            .ok_or_else(overflow)?;
        let total_size = HEADER_SIZE
            .checked_add(pixels_len)
            .and_then(|n| n.checked_add(stats_len))
            .ok_or_else(overflow)?;

        Ok(Self {
            resolution,
            stats,
            pixels_len,
            stats_len,
            total_size,
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn stats(&self) -> StatsLayout {
        self.stats
    }

    /// Offset of the first pixel.
    pub fn pixels_offset(&self) -> usize {
        HEADER_SIZE
    }

    /// Length of the pixel grid in bytes.
    pub fn pixels_len(&self) -> usize {
        self.pixels_len
    }

    /// Offset of the first statistics record.
    pub fn stats_offset(&self) -> usize {
        HEADER_SIZE + self.pixels_len
    }

    /// Length of the statistics table in bytes.
    pub fn stats_len(&self) -> usize {
        self.stats_len
    }

    /// Exact segment size: `4 + W*H*4 + max_ports*record_size`.
    pub fn total_size(&self) -> usize {
        self.total_size
    }
}
