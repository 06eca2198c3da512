// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

use serde::{Deserialize, Serialize};

/// Point-in-time description of a canvas, printed by the CLI as text or JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSummary {
    pub name: String,
    pub width: u16,
    pub height: u16,
    pub segment_size: usize,
    pub max_ports: usize,
    pub record_size: usize,
    pub occupied_ports: Vec<usize>,
    pub lit_pixels: usize,
    pub checksum: u32,
}

impl CanvasSummary {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
