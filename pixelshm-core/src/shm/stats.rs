// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Per-port statistics table.
//!
//! The segment reserves `max_ports` fixed-size slots after the pixel grid.
//! Record contents belong to the packet-processing side; this view only
//! addresses the slots and copies bytes in and out. An all-zero slot is
//! an uninitialized one.

use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::error::StatsError;
use crate::shm::layout::StatsLayout;

/// Marker for plain-old-data records that may live in a statistics slot.
///
/// # Safety
/// Implementors must be `#[repr(C)]` (or a primitive/array of primitives),
/// contain no pointers, and accept every bit pattern, the all-zero one in
/// particular, as a valid value.
pub unsafe trait StatsRecord: Copy + 'static {}

// SAFETY: byte and integer arrays accept every bit pattern
unsafe impl<const N: usize> StatsRecord for [u8; N] {}
unsafe impl<const N: usize> StatsRecord for [u64; N] {}

/// Indexable view over the statistics slots of a mapped canvas.
pub struct PortStatsTable<'a> {
    base: NonNull<u8>,
    layout: StatsLayout,
    _canvas: PhantomData<&'a [u8]>,
}

impl<'a> PortStatsTable<'a> {
    /// # Safety
    /// `base` must point at `max_ports * record_size` mapped bytes that stay
    /// mapped for `'a`.
    pub(crate) unsafe fn from_raw(base: NonNull<u8>, layout: StatsLayout) -> Self {
        Self {
            base,
            layout,
            _canvas: PhantomData,
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.layout.max_ports()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record_size(&self) -> usize {
        self.layout.record_size()
    }

    fn slot_ptr(&self, port: usize) -> Result<*mut u8, StatsError> {
        if port >= self.layout.max_ports() {
            return Err(StatsError::PortOutOfRange {
                port,
                max_ports: self.layout.max_ports(),
            });
        }
        // SAFETY: port < max_ports keeps the offset inside the table
        Ok(unsafe { self.base.as_ptr().add(port * self.layout.record_size()) })
    }

    fn check_len(&self, actual: usize) -> Result<(), StatsError> {
        if actual != self.layout.record_size() {
            return Err(StatsError::RecordSizeMismatch {
                expected: self.layout.record_size(),
                actual,
            });
        }
        Ok(())
    }

    /// Copy slot `port` into `buf`, which must be exactly one record long.
    pub fn read(&self, port: usize, buf: &mut [u8]) -> Result<(), StatsError> {
        self.check_len(buf.len())?;
        let src = self.slot_ptr(port)?;
        // SAFETY: src is valid for record_size bytes and cannot overlap buf
        unsafe { std::ptr::copy_nonoverlapping(src, buf.as_mut_ptr(), buf.len()) };
        Ok(())
    }

    /// Copy one record worth of `bytes` into slot `port`.
    pub fn write(&self, port: usize, bytes: &[u8]) -> Result<(), StatsError> {
        self.check_len(bytes.len())?;
        let dst = self.slot_ptr(port)?;
        // SAFETY: dst is valid for record_size bytes and cannot overlap bytes
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len()) };
        Ok(())
    }

    /// Zero slot `port`, marking it uninitialized.
    pub fn clear(&self, port: usize) -> Result<(), StatsError> {
        let dst = self.slot_ptr(port)?;
        // SAFETY: dst is valid for record_size bytes
        unsafe { std::ptr::write_bytes(dst, 0, self.layout.record_size()) };
        Ok(())
    }

    /// Whether slot `port` is still all zero.
    pub fn is_vacant(&self, port: usize) -> Result<bool, StatsError> {
        let mut buf = vec![0u8; self.layout.record_size()];
        self.read(port, &mut buf)?;
        Ok(buf.iter().all(|&b| b == 0))
    }

    /// Indices of slots holding a non-zero record.
    pub fn occupied(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&port| matches!(self.is_vacant(port), Ok(false)))
            .collect()
    }

    /// Read slot `port` as a typed record.
    pub fn load<T: StatsRecord>(&self, port: usize) -> Result<T, StatsError> {
        self.check_len(std::mem::size_of::<T>())?;
        let src = self.slot_ptr(port)?;
        // SAFETY: size matches, T accepts any bit pattern, slots may be unaligned
        Ok(unsafe { std::ptr::read_unaligned(src as *const T) })
    }

    /// Write a typed record into slot `port`.
    pub fn store<T: StatsRecord>(&self, port: usize, record: &T) -> Result<(), StatsError> {
        self.check_len(std::mem::size_of::<T>())?;
        let dst = self.slot_ptr(port)?;
        // SAFETY: size matches and slots may be unaligned
        unsafe { std::ptr::write_unaligned(dst as *mut T, *record) };
        Ok(())
    }
}
