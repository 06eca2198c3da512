// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `pixelshm set|get|fill` commands - Single pixel and whole frame writes.
//!
//! Goes through the locked canvas so a one-off write from the shell is
//! serialized against other locked users and reports out-of-range input.

use pixelshm_core::shm::LockedCanvas;
use pixelshm_core::SharedCanvas;

use super::Target;

fn open(target: &Target) -> Result<LockedCanvas, Box<dyn std::error::Error>> {
    let canvas = SharedCanvas::attach_config(&target.attach_config()?)?;
    Ok(LockedCanvas::new(canvas))
}

pub async fn set(target: &Target, x: u16, y: u16, rgba: u32) -> Result<(), Box<dyn std::error::Error>> {
    let canvas = open(target)?;
    canvas.set(x, y, rgba)?;
    tracing::debug!(x, y, rgba = %format!("{:08x}", rgba), "Pixel written");
    println!("✓ ({}, {}) = {:08x}", x, y, rgba);
    Ok(())
}

pub async fn get(target: &Target, x: u16, y: u16) -> Result<(), Box<dyn std::error::Error>> {
    let canvas = open(target)?;
    println!("{:08x}", canvas.get(x, y)?);
    Ok(())
}

pub async fn fill(target: &Target, rgba: u32) -> Result<(), Box<dyn std::error::Error>> {
    let canvas = open(target)?;
    let _guard = canvas.lock()?;
    canvas.inner().fill(rgba);
    println!(
        "✓ Filled {} pixels with {:08x}",
        canvas.inner().resolution().pixel_count(),
        rgba
    );
    Ok(())
}
