// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `pixelshm watch` command - Follow frame changes.
//!
//! Samples the frame at a fixed rate and prints a line whenever its
//! checksum changes, until Ctrl-C.

use std::time::Duration;

use pixelshm_core::SharedCanvas;
use tokio::{signal, time};

use super::Target;

/// Highest sampling rate accepted on the command line.
pub const MAX_FPS: u32 = 1000;

/// Time between two samples at `fps`, clamped to `1..=MAX_FPS`.
fn sample_period(fps: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(fps.clamp(1, MAX_FPS)))
}

pub async fn execute(target: &Target, fps: u32) -> Result<(), Box<dyn std::error::Error>> {
    let canvas = SharedCanvas::attach_config(&target.attach_config()?)?;
    let mut interval = time::interval(sample_period(fps));
    let mut last_checksum = None;

    tracing::info!(name = %canvas.name(), fps, "Watching canvas, press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let start = std::time::Instant::now();
                let checksum = canvas.checksum();
                if last_checksum != Some(checksum) {
                    println!(
                        "crc32={:08x} lit={} ports={}",
                        checksum,
                        canvas.lit_pixels(),
                        canvas.stats().occupied().len()
                    );
                    last_checksum = Some(checksum);
                }
                tracing::trace!(elapsed = ?start.elapsed(), "Sample completed");
            }
            result = signal::ctrl_c() => {
                result?;
                tracing::info!("Exiting...");
                return Ok(());
            }
        }
    }
}
