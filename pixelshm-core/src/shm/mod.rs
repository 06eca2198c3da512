// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shared Memory canvas module.
//!
//! Zero-copy pixel hand-off between processes using POSIX shared memory.
//! One named segment holds a width/height header, the pixel grid and a
//! per-port statistics table.

mod canvas;
mod layout;
#[cfg(feature = "locked")]
mod locked;
mod region;
mod stats;

pub use canvas::{PixelSpan, SharedCanvas};
pub use layout::{
    CanvasLayout, StatsLayout, DEFAULT_MAX_PORTS, DEFAULT_RECORD_SIZE, HEADER_SIZE, PIXEL_SIZE,
};
#[cfg(feature = "locked")]
pub use locked::{CanvasGuard, LockedCanvas};
pub use region::{Attachment, SharedMemoryRegion};
pub use stats::{PortStatsTable, StatsRecord};
