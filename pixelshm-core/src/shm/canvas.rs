// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! SharedCanvas - the pixel grid living in a named shared memory segment.
//!
//! A backend writes pixels, any number of frontends read them, each process
//! holding its own mapping of the same segment. No locks are taken: every
//! pixel is a `u32` accessed with relaxed atomics, so concurrent writers to
//! the same cell race and the last writer wins at word granularity.

use std::ops::Range;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};

use crate::config::{AttachConfig, CanvasConfig};
use crate::error::{CanvasResult, OpenError};
use crate::shm::layout::{CanvasLayout, StatsLayout, HEADER_SIZE};
use crate::shm::region::{Attachment, SharedMemoryRegion};
use crate::shm::stats::PortStatsTable;
use crate::summary::CanvasSummary;
use crate::types::{Resolution, SegmentName};

/// A contiguous row-major run of pixels, handed to one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSpan {
    /// Index range into the pixel grid.
    pub range: Range<usize>,
    /// Coordinate of the first pixel in the span.
    pub start_x: u16,
    pub start_y: u16,
}

/// Process-local handle onto a canvas segment.
///
/// Holds typed views into the header, pixel grid and statistics table,
/// derived once from a validated [`CanvasLayout`].
pub struct SharedCanvas {
    region: SharedMemoryRegion,
    layout: CanvasLayout,
    attachment: Attachment,
    pixels: NonNull<AtomicU32>,
    stats: NonNull<u8>,
}

// SAFETY: the pointers target the mapping owned by `region`, which lives as
// long as the canvas. Pixels are only touched through atomics.
unsafe impl Send for SharedCanvas {}

// SAFETY: see above; statistics records are raw shared storage whose
// concurrent use is the caller's contract, exactly as across processes.
unsafe impl Sync for SharedCanvas {}

impl SharedCanvas {
    /// Create or attach the segment `name` for a canvas of `resolution`.
    ///
    /// The segment must be exactly `4 + W*H*4 + max_ports*record_size` bytes,
    /// or empty (freshly created, then grown and zero-filled). Afterwards the
    /// header is negotiated: a zero field is claimed with the requested value,
    /// a non-zero field must equal it. Both fields are checked before either
    /// is claimed, so a conflicting header is left untouched.
    ///
    /// Creation is not mutually exclusive. Two processes that both observe a
    /// fresh segment will both zero-fill it; the header still ends up
    /// consistent as long as they request the same resolution.
    pub fn open(
        name: &SegmentName,
        resolution: Resolution,
        stats: StatsLayout,
    ) -> CanvasResult<Self> {
        let layout = CanvasLayout::new(resolution, stats)?;
        let (region, attachment) = SharedMemoryRegion::open_or_create(name, &layout)?;

        let canvas = Self::from_region(region, layout, attachment);
        canvas.negotiate_header()?;

        tracing::info!(
            name = %name,
            resolution = %resolution,
            size = layout.total_size(),
            attachment = ?attachment,
            "Opened shared canvas"
        );

        Ok(canvas)
    }

    /// Open the canvas described by a loaded configuration.
    pub fn from_config(config: &CanvasConfig) -> CanvasResult<Self> {
        Self::open(&config.name, config.resolution, config.stats)
    }

    /// Attach using a loaded configuration, resolution taken from the header.
    pub fn attach_config(config: &AttachConfig) -> CanvasResult<Self> {
        Self::attach(&config.name, config.stats)
    }

    /// Attach to an existing canvas, taking its resolution from the header.
    ///
    /// Used by consumers that do not know the resolution up front. The segment
    /// must already exist and carry a non-zero header.
    pub fn attach(name: &SegmentName, stats: StatsLayout) -> CanvasResult<Self> {
        let region = SharedMemoryRegion::open_existing(name)?;

        let (width, height) = {
            let header = header_of(&region);
            (
                header[0].load(Ordering::Relaxed),
                header[1].load(Ordering::Relaxed),
            )
        };
        if width == 0 || height == 0 {
            return Err(OpenError::NotInitialized {
                name: name.to_string(),
                width,
                height,
            }
            .into());
        }

        let layout = CanvasLayout::new(Resolution::new(width, height)?, stats)?;
        if region.size() != layout.total_size() {
            tracing::warn!(
                name = %name,
                expected = layout.total_size(),
                actual = region.size(),
                "Header does not match the segment size"
            );
            return Err(OpenError::DimensionMismatch {
                name: name.to_string(),
                expected: layout.total_size(),
                actual: region.size(),
                width,
                height,
            }
            .into());
        }

        tracing::info!(name = %name, width, height, "Found existing canvas");

        Ok(Self::from_region(region, layout, Attachment::Reused))
    }

    fn from_region(region: SharedMemoryRegion, layout: CanvasLayout, attachment: Attachment) -> Self {
        let base = region.as_ptr();

        // SAFETY: both offsets are within the mapping, which is exactly
        // `layout.total_size()` bytes. The pixel offset is 4 into a
        // page-aligned mapping, so it is aligned for u32.
        let (pixels, stats) = unsafe {
            (
                NonNull::new_unchecked(base.add(layout.pixels_offset()) as *mut AtomicU32),
                NonNull::new_unchecked(base.add(layout.stats_offset())),
            )
        };

        Self {
            region,
            layout,
            attachment,
            pixels,
            stats,
        }
    }

    fn negotiate_header(&self) -> Result<(), OpenError> {
        let header = header_of(&self.region);
        let resolution = self.layout.resolution();
        let name = self.region.name();

        let width_mismatch = |stored: u16| {
            tracing::warn!(name = %name, stored, requested = resolution.width(), "Width mismatch");
            OpenError::WidthMismatch {
                name: name.to_string(),
                stored,
                requested: resolution.width(),
            }
        };
        let height_mismatch = |stored: u16| {
            tracing::warn!(name = %name, stored, requested = resolution.height(), "Height mismatch");
            OpenError::HeightMismatch {
                name: name.to_string(),
                stored,
                requested: resolution.height(),
            }
        };

        // Reject a conflicting header before claiming either field, so a
        // mismatch leaves the segment as it was found.
        check(&header[0], resolution.width()).map_err(width_mismatch)?;
        check(&header[1], resolution.height()).map_err(height_mismatch)?;

        claim(&header[0], resolution.width()).map_err(width_mismatch)?;
        claim(&header[1], resolution.height()).map_err(height_mismatch)?;

        Ok(())
    }

    pub fn name(&self) -> &SegmentName {
        self.region.name()
    }

    pub fn width(&self) -> u16 {
        self.layout.resolution().width()
    }

    pub fn height(&self) -> u16 {
        self.layout.resolution().height()
    }

    pub fn resolution(&self) -> Resolution {
        self.layout.resolution()
    }

    pub fn layout(&self) -> &CanvasLayout {
        &self.layout
    }

    /// Whether this handle created the segment or reused an existing one.
    pub fn attachment(&self) -> Attachment {
        self.attachment
    }

    /// The pixel grid as atomics, row-major.
    #[inline]
    pub fn pixels(&self) -> &[AtomicU32] {
        // SAFETY: the pixel region holds exactly pixel_count() u32 cells
        unsafe {
            std::slice::from_raw_parts(self.pixels.as_ptr(), self.layout.resolution().pixel_count())
        }
    }

    /// Write `rgba` at `(x, y)`. Out-of-range coordinates are ignored.
    #[inline]
    pub fn set(&self, x: u16, y: u16, rgba: u32) {
        self.try_set(x, y, rgba);
    }

    /// Write `rgba` at `(x, y)`, returning whether the pixel was on the canvas.
    #[inline]
    pub fn try_set(&self, x: u16, y: u16, rgba: u32) -> bool {
        let resolution = self.layout.resolution();
        if !resolution.contains(x, y) {
            return false;
        }
        // SAFETY: contains() guarantees the index is within the grid
        unsafe { self.pixels().get_unchecked(resolution.index(x, y)) }.store(rgba, Ordering::Relaxed);
        true
    }

    /// Read the pixel at `(x, y)`.
    ///
    /// Callers must pass in-range coordinates. `x` is not checked against the
    /// width: an `x` past the right edge reads into the following row. An index
    /// past the end of the grid panics.
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> u32 {
        self.pixels()[self.layout.resolution().index(x, y)].load(Ordering::Relaxed)
    }

    /// Read the pixel at `(x, y)` if it is on the canvas.
    pub fn get_checked(&self, x: u16, y: u16) -> Option<u32> {
        let resolution = self.layout.resolution();
        resolution
            .contains(x, y)
            .then(|| self.pixels()[resolution.index(x, y)].load(Ordering::Relaxed))
    }

    /// Read the pixel at `(x, y)` without any check.
    ///
    /// # Safety
    /// `x + y * width` must be below `width * height`.
    #[inline]
    pub unsafe fn get_unchecked(&self, x: u16, y: u16) -> u32 {
        self.pixels()
            .get_unchecked(self.layout.resolution().index(x, y))
            .load(Ordering::Relaxed)
    }

    /// Copy the whole frame out of shared memory.
    pub fn snapshot(&self) -> Vec<u32> {
        self.pixels()
            .iter()
            .map(|p| p.load(Ordering::Relaxed))
            .collect()
    }

    /// Set every pixel to `rgba`.
    pub fn fill(&self, rgba: u32) {
        for pixel in self.pixels() {
            pixel.store(rgba, Ordering::Relaxed);
        }
    }

    pub fn clear(&self) {
        self.fill(0);
    }

    /// Split the grid into at most `parts` contiguous spans of near-equal size.
    pub fn partition(&self, parts: usize) -> Vec<PixelSpan> {
        let resolution = self.layout.resolution();
        let total = resolution.pixel_count();
        let chunk = total.div_ceil(parts.max(1));

        (0..total)
            .step_by(chunk)
            .map(|start| {
                let (start_x, start_y) = resolution.coords(start);
                PixelSpan {
                    range: start..(start + chunk).min(total),
                    start_x,
                    start_y,
                }
            })
            .collect()
    }

    /// Hand every pixel of `span` with a non-zero colour to `f` and reset it
    /// to zero.
    ///
    /// Alpha is ignored: a pixel whose RGB bytes are all zero counts as
    /// unchanged and is left in place. Returns the number of pixels drained.
    /// A writer that lands between the read and the reset is not lost: the
    /// reset swaps, and the swapped-out value is what `f` receives.
    pub fn drain(&self, span: &PixelSpan, mut f: impl FnMut(u16, u16, u32)) -> usize {
        let resolution = self.layout.resolution();
        let mut drained = 0;

        for (offset, pixel) in self.pixels()[span.range.clone()].iter().enumerate() {
            if pixel.load(Ordering::Relaxed) >> 8 == 0 {
                continue;
            }
            let rgba = pixel.swap(0, Ordering::Relaxed);
            if rgba >> 8 != 0 {
                let (x, y) = resolution.coords(span.range.start + offset);
                f(x, y, rgba);
                drained += 1;
            }
        }

        drained
    }

    /// Number of pixels that are not zero.
    pub fn lit_pixels(&self) -> usize {
        self.pixels()
            .iter()
            .filter(|p| p.load(Ordering::Relaxed) != 0)
            .count()
    }

    /// CRC32 over the frame in native byte order.
    pub fn checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for pixel in self.pixels() {
            hasher.update(&pixel.load(Ordering::Relaxed).to_ne_bytes());
        }
        hasher.finalize()
    }

    /// View onto the per-port statistics table.
    pub fn stats(&self) -> PortStatsTable<'_> {
        // SAFETY: stats points at stats_len() bytes inside the mapping owned by self
        unsafe { PortStatsTable::from_raw(self.stats, self.layout.stats()) }
    }

    /// Point-in-time description of the canvas.
    pub fn summary(&self) -> CanvasSummary {
        let stats = self.layout.stats();
        CanvasSummary {
            name: self.name().to_string(),
            width: self.width(),
            height: self.height(),
            segment_size: self.layout.total_size(),
            max_ports: stats.max_ports(),
            record_size: stats.record_size(),
            occupied_ports: self.stats().occupied(),
            lit_pixels: self.lit_pixels(),
            checksum: self.checksum(),
        }
    }

    #[cfg_attr(not(feature = "locked"), allow(dead_code))]
    pub(crate) fn region(&self) -> &SharedMemoryRegion {
        &self.region
    }
}

impl std::fmt::Debug for SharedCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCanvas")
            .field("name", self.name())
            .field("resolution", &self.resolution())
            .field("attachment", &self.attachment)
            .finish()
    }
}

/// The two header words (width, height).
fn header_of(region: &SharedMemoryRegion) -> &[AtomicU16; 2] {
    debug_assert!(region.size() >= HEADER_SIZE);
    // SAFETY: every mapped region holds at least HEADER_SIZE bytes and the
    // mapping is page-aligned. The reference borrows from `region`.
    unsafe { &*(region.as_ptr() as *const [AtomicU16; 2]) }
}

/// Whether a header field is unset or already holds `requested`.
/// Returns the stored value on mismatch.
fn check(field: &AtomicU16, requested: u16) -> Result<(), u16> {
    match field.load(Ordering::Relaxed) {
        stored if stored == 0 || stored == requested => Ok(()),
        stored => Err(stored),
    }
}

/// Claim a zero header field with `requested`, or check it already holds it.
/// Returns the stored value on mismatch.
fn claim(field: &AtomicU16, requested: u16) -> Result<(), u16> {
    match field.compare_exchange(0, requested, Ordering::Relaxed, Ordering::Relaxed) {
        Ok(_) => Ok(()),
        Err(stored) if stored == requested => Ok(()),
        Err(stored) => Err(stored),
    }
}
