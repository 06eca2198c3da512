// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Locked canvas access (feature `locked`).
//!
//! Wraps a [`SharedCanvas`] and takes an advisory `flock` on the segment
//! descriptor around every operation. Every process that goes through
//! `LockedCanvas` is serialized against the others; plain `SharedCanvas`
//! users are not, since the lock is advisory. Out-of-range input is reported
//! instead of ignored.

use crate::error::{CanvasError, CanvasResult};
use crate::shm::canvas::SharedCanvas;
use crate::shm::layout::StatsLayout;
use crate::types::{Resolution, SegmentName};

/// Canvas handle whose operations hold an exclusive segment lock.
#[derive(Debug)]
pub struct LockedCanvas {
    canvas: SharedCanvas,
}

/// Exclusive lock on the segment, released on drop.
pub struct CanvasGuard<'a> {
    canvas: &'a SharedCanvas,
}

impl LockedCanvas {
    pub fn new(canvas: SharedCanvas) -> Self {
        Self { canvas }
    }

    /// Open the canvas like [`SharedCanvas::open`] and wrap it.
    pub fn open(name: &SegmentName, resolution: Resolution, stats: StatsLayout) -> CanvasResult<Self> {
        Ok(Self::new(SharedCanvas::open(name, resolution, stats)?))
    }

    /// The unlocked canvas underneath.
    pub fn inner(&self) -> &SharedCanvas {
        &self.canvas
    }

    pub fn into_inner(self) -> SharedCanvas {
        self.canvas
    }

    /// Block until the segment lock is held.
    pub fn lock(&self) -> CanvasResult<CanvasGuard<'_>> {
        loop {
            match flock(&self.canvas, libc::LOCK_EX) {
                Ok(()) => return Ok(CanvasGuard { canvas: &self.canvas }),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(lock_error(&self.canvas, e)),
            }
        }
    }

    /// Take the segment lock if nobody else holds it.
    pub fn try_lock(&self) -> CanvasResult<Option<CanvasGuard<'_>>> {
        match flock(&self.canvas, libc::LOCK_EX | libc::LOCK_NB) {
            Ok(()) => Ok(Some(CanvasGuard { canvas: &self.canvas })),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(lock_error(&self.canvas, e)),
        }
    }

    /// Write a pixel under the lock.
    pub fn set(&self, x: u16, y: u16, rgba: u32) -> CanvasResult<()> {
        self.lock()?.set(x, y, rgba)
    }

    /// Read a pixel under the lock.
    pub fn get(&self, x: u16, y: u16) -> CanvasResult<u32> {
        self.lock()?.get(x, y)
    }

    /// Write a statistics record under the lock.
    pub fn write_stats(&self, port: usize, bytes: &[u8]) -> CanvasResult<()> {
        let _guard = self.lock()?;
        Ok(self.canvas.stats().write(port, bytes)?)
    }

    /// Read a statistics record under the lock.
    pub fn read_stats(&self, port: usize, buf: &mut [u8]) -> CanvasResult<()> {
        let _guard = self.lock()?;
        Ok(self.canvas.stats().read(port, buf)?)
    }
}

impl CanvasGuard<'_> {
    pub fn set(&self, x: u16, y: u16, rgba: u32) -> CanvasResult<()> {
        if self.canvas.try_set(x, y, rgba) {
            Ok(())
        } else {
            Err(self.out_of_bounds(x, y))
        }
    }

    pub fn get(&self, x: u16, y: u16) -> CanvasResult<u32> {
        self.canvas
            .get_checked(x, y)
            .ok_or_else(|| self.out_of_bounds(x, y))
    }

    /// Copy the frame while holding the lock.
    pub fn snapshot(&self) -> Vec<u32> {
        self.canvas.snapshot()
    }

    fn out_of_bounds(&self, x: u16, y: u16) -> CanvasError {
        CanvasError::PixelOutOfBounds {
            x,
            y,
            width: self.canvas.width(),
            height: self.canvas.height(),
        }
    }
}

impl Drop for CanvasGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = flock(self.canvas, libc::LOCK_UN) {
            tracing::error!(name = %self.canvas.name(), error = %e, "Failed to release segment lock");
        }
    }
}

fn flock(canvas: &SharedCanvas, operation: libc::c_int) -> std::io::Result<()> {
    // SAFETY: the descriptor stays open for as long as the canvas lives
    if unsafe { libc::flock(canvas.region().raw_fd(), operation) } < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

fn lock_error(canvas: &SharedCanvas, source: std::io::Error) -> CanvasError {
    CanvasError::Lock {
        name: canvas.name().to_string(),
        source,
    }
}
