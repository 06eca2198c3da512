// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `pixelshm ports` command - Show occupied statistics slots.
//!
//! Records are opaque here; each occupied slot is shown as a hex preview.

use pixelshm_core::SharedCanvas;

use super::Target;

/// Bytes of each record shown in the preview column.
const PREVIEW_BYTES: usize = 16;

pub async fn execute(target: &Target) -> Result<(), Box<dyn std::error::Error>> {
    let canvas = SharedCanvas::attach_config(&target.attach_config()?)?;
    let table = canvas.stats();
    let occupied = table.occupied();

    if occupied.is_empty() {
        println!("No port statistics recorded yet ({} slots).", table.len());
        return Ok(());
    }

    println!("╔══════╦══════════════════════════════════════════════════╗");
    println!("║ Port ║ Record                                           ║");
    println!("╠══════╬══════════════════════════════════════════════════╣");

    let mut record = vec![0u8; table.record_size()];
    for port in &occupied {
        table.read(*port, &mut record)?;
        let mut preview: String = record
            .iter()
            .take(PREVIEW_BYTES)
            .map(|b| format!("{:02x} ", b))
            .collect();
        if record.len() > PREVIEW_BYTES {
            preview.push('…');
        }
        println!("║ {:<4} ║ {:<48} ║", port, preview.trim_end());
    }

    println!("╚══════╩══════════════════════════════════════════════════╝");
    println!();
    println!("Total: {} of {} slot(s) occupied", occupied.len(), table.len());

    Ok(())
}
