// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `pixelshm info` command - Describe an existing canvas.

use pixelshm_core::{CanvasSummary, SharedCanvas};

use super::Target;

pub async fn execute(target: &Target, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let canvas = SharedCanvas::attach_config(&target.attach_config()?)?;
    let summary = canvas.summary();

    if json {
        println!("{}", summary.to_json()?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

pub fn print_summary(summary: &CanvasSummary) {
    println!("Canvas {}:", summary.name);
    println!("  Resolution:     {}x{}", summary.width, summary.height);
    println!("  Segment Size:   {} bytes", summary.segment_size);
    println!(
        "  Port Slots:     {} x {} bytes ({} occupied)",
        summary.max_ports,
        summary.record_size,
        summary.occupied_ports.len()
    );
    println!("  Lit Pixels:     {}", summary.lit_pixels);
    println!("  Frame CRC32:    {:08x}", summary.checksum);
}
