// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `pixelshm remove` command - Unlink the segment so it can be recreated.

use pixelshm_core::shm::SharedMemoryRegion;

use super::Target;

pub async fn execute(target: &Target) -> Result<(), Box<dyn std::error::Error>> {
    let config = target.attach_config()?;
    SharedMemoryRegion::unlink(&config.name)?;
    println!("✓ Removed {}", config.name);
    Ok(())
}
