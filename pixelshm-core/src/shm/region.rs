//! SharedMemoryRegion - POSIX shared memory wrapper.
//!
//! Provides safe abstraction over shm_open, ftruncate and mmap for the canvas
//! segment. All unsafe operations are encapsulated here; the region never
//! unlinks its segment, which outlives every process that maps it.

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::ptr::NonNull;

use crate::error::{CanvasError, OpenError};
use crate::shm::layout::{CanvasLayout, HEADER_SIZE};
use crate::types::SegmentName;

/// Permissions for newly created segments. Frontends often run as another user.
const SEGMENT_MODE: libc::mode_t = 0o666;

/// How a segment came to be mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// The segment had size 0 and was grown and zero-filled by this call.
    Created,
    /// The segment already had the expected size and was reused as-is.
    Reused,
}

/// Represents a mapped shared memory region.
///
/// This struct owns the mapping and unmaps it on drop. The named segment
/// itself persists until [`SharedMemoryRegion::unlink`] is called.
pub struct SharedMemoryRegion {
    /// Name of the shared memory object.
    name: SegmentName,
    /// Pointer to the mapped memory.
    ptr: NonNull<u8>,
    /// Size of the mapped region in bytes.
    size: usize,
    /// File descriptor for the shared memory object.
    fd: OwnedFd,
}

// SAFETY: SharedMemoryRegion owns its mapping; moving it between threads is fine.
unsafe impl Send for SharedMemoryRegion {}

// SAFETY: the region hands out raw pointers only. Accessors built on top of it
// use atomics for every word they touch concurrently.
unsafe impl Sync for SharedMemoryRegion {}

impl SharedMemoryRegion {
    /// Create the segment or attach to an existing one of exactly
    /// `layout.total_size()` bytes.
    ///
    /// A segment of size 0 counts as freshly created: it is grown to the
    /// expected size and zero-filled after mapping. A segment of any other
    /// size is rejected with [`OpenError::DimensionMismatch`] and left alone.
    pub fn open_or_create(
        name: &SegmentName,
        layout: &CanvasLayout,
    ) -> Result<(Self, Attachment), OpenError> {
        let expected = layout.total_size();
        let fd = shm_open(name, libc::O_CREAT | libc::O_RDWR, SEGMENT_MODE)?;
        let current = segment_size(name, &fd)?;

        let attachment = if current == 0 {
            // SAFETY: fd is a valid, open shared memory descriptor
            let result = unsafe { libc::ftruncate(fd.as_raw_fd(), expected as libc::off_t) };
            if result < 0 {
                return Err(OpenError::Resize {
                    name: name.to_string(),
                    size: expected,
                    source: std::io::Error::last_os_error(),
                });
            }
            Attachment::Created
        } else if current != expected {
            let resolution = layout.resolution();
            tracing::warn!(
                name = %name,
                expected,
                actual = current,
                resolution = %resolution,
                "Existing shared memory has a different size"
            );
            return Err(OpenError::DimensionMismatch {
                name: name.to_string(),
                expected,
                actual: current,
                width: resolution.width(),
                height: resolution.height(),
            });
        } else {
            tracing::debug!(name = %name, size = current, "Using existing shared memory of correct size");
            Attachment::Reused
        };

        let region = Self::map(name, fd, expected)?;

        if attachment == Attachment::Created {
            // Statistics records and the header rely on zero meaning "uninitialized".
            // SAFETY: ptr is valid for `size` bytes
            unsafe { std::ptr::write_bytes(region.ptr.as_ptr(), 0, region.size) };
        }

        Ok((region, attachment))
    }

    /// Map an existing segment at its current size without creating it.
    pub fn open_existing(name: &SegmentName) -> Result<Self, OpenError> {
        let fd = shm_open(name, libc::O_RDWR, 0)?;
        let size = segment_size(name, &fd)?;

        if size < HEADER_SIZE {
            return Err(OpenError::TooSmall {
                name: name.to_string(),
                size,
            });
        }

        Self::map(name, fd, size)
    }

    /// Remove the segment name from the shared memory namespace.
    ///
    /// Existing mappings stay valid until their owners drop them.
    pub fn unlink(name: &SegmentName) -> Result<(), CanvasError> {
        nix::sys::mman::shm_unlink(name.as_str()).map_err(|errno| CanvasError::Io {
            context: "unlinking shared memory segment",
            source: errno.into(),
        })?;
        tracing::info!(name = %name, "Unlinked shared memory segment");
        Ok(())
    }

    fn map(name: &SegmentName, fd: OwnedFd, size: usize) -> Result<Self, OpenError> {
        // SAFETY: fd is valid, size is non-zero and matches the segment
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd.as_raw_fd(),
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(OpenError::Map {
                name: name.to_string(),
                source: std::io::Error::last_os_error(),
            });
        }

        let ptr = NonNull::new(ptr as *mut u8).ok_or_else(|| OpenError::Map {
            name: name.to_string(),
            source: std::io::Error::other("mmap returned null"),
        })?;

        Ok(Self {
            name: name.clone(),
            ptr,
            size,
            fd,
        })
    }

    /// Get the name of this shared memory region.
    pub fn name(&self) -> &SegmentName {
        &self.name
    }

    /// Get the size of this shared memory region.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get a raw pointer to the shared memory.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[cfg_attr(not(feature = "locked"), allow(dead_code))]
    pub(crate) fn raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl Drop for SharedMemoryRegion {
    fn drop(&mut self) {
        // SAFETY: ptr and size were set during mapping
        let result = unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size) };
        if result < 0 {
            tracing::error!(
                name = %self.name,
                error = %std::io::Error::last_os_error(),
                "Failed to unmap shared memory"
            );
        }
    }
}

fn shm_open(name: &SegmentName, flags: libc::c_int, mode: libc::mode_t) -> Result<OwnedFd, OpenError> {
    let c_name = name.to_cstring();

    // SAFETY: c_name is a valid CString, flags are valid POSIX flags
    let fd = unsafe { libc::shm_open(c_name.as_ptr(), flags, mode) };
    if fd < 0 {
        return Err(OpenError::Access {
            name: name.to_string(),
            source: std::io::Error::last_os_error(),
        });
    }

    // SAFETY: fd was just returned by shm_open and is owned by nobody else
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn segment_size(name: &SegmentName, fd: &OwnedFd) -> Result<usize, OpenError> {
    // SAFETY: zeroed is a valid bit pattern for libc::stat
    let mut stat: libc::stat = unsafe { std::mem::zeroed() };

    // SAFETY: fd is valid and stat points to writable memory
    if unsafe { libc::fstat(fd.as_raw_fd(), &mut stat) } < 0 {
        return Err(OpenError::Stat {
            name: name.to_string(),
            source: std::io::Error::last_os_error(),
        });
    }

    Ok(stat.st_size as usize)
}
