// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `pixelshm create` command - Create or attach the canvas segment.

use pixelshm_core::shm::Attachment;
use pixelshm_core::SharedCanvas;

use super::info::print_summary;
use super::Target;

pub async fn execute(
    target: &Target,
    width: Option<u16>,
    height: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = target.canvas_config(width, height)?;
    tracing::info!(name = %config.name, resolution = %config.resolution, "Creating canvas");

    let canvas = SharedCanvas::from_config(&config)?;

    match canvas.attachment() {
        Attachment::Created => println!("✓ Created canvas {}", canvas.name()),
        Attachment::Reused => println!("✓ Canvas {} already exists with matching size", canvas.name()),
    }
    println!();
    print_summary(&canvas.summary());

    Ok(())
}
