// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Following the "Newtype" pattern in Rust to ensure valid state by construction.
//! All types validate their invariants at creation time.

use std::ffi::CString;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Longest segment name accepted, including the leading slash (NAME_MAX).
const MAX_SEGMENT_NAME_LEN: usize = 255;

/// Validated shared memory segment name.
///
/// Stored with a leading `/`, which is added when the caller omits it.
/// Beyond that the name is handed to `shm_open` untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SegmentName(String);

impl SegmentName {
    /// Create a new SegmentName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, HardValidationError> {
        let name = name.into();

        if name.is_empty() || name == "/" {
            return Err(HardValidationError::InvalidSegmentName {
                name,
                reason: "Segment name cannot be empty".to_string(),
            });
        }

        if name.contains('\0') {
            return Err(HardValidationError::InvalidSegmentName {
                name,
                reason: "Segment name cannot contain NUL bytes".to_string(),
            });
        }

        let name = if name.starts_with('/') {
            name
        } else {
            format!("/{}", name)
        };

        if name.len() > MAX_SEGMENT_NAME_LEN {
            return Err(HardValidationError::InvalidSegmentName {
                reason: format!(
                    "Segment name too long: {} bytes (max {})",
                    name.len(),
                    MAX_SEGMENT_NAME_LEN
                ),
                name,
            });
        }

        Ok(Self(name))
    }

    /// Get the name including its leading slash.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name as a C string for the libc shm calls.
    pub(crate) fn to_cstring(&self) -> CString {
        // Interior NULs are rejected in `new`, so this cannot fail.
        CString::new(self.0.as_bytes()).unwrap_or_default()
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SegmentName {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SegmentName> for String {
    fn from(name: SegmentName) -> Self {
        name.0
    }
}

/// Validated canvas resolution.
/// Both axes must be non-zero; a zero header field means "uninitialized".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawResolution")]
pub struct Resolution {
    width: u16,
    height: u16,
}

/// Unvalidated form of [`Resolution`] as it appears in serialized input.
#[derive(Deserialize)]
struct RawResolution {
    width: u16,
    height: u16,
}

impl TryFrom<RawResolution> for Resolution {
    type Error = HardValidationError;

    fn try_from(raw: RawResolution) -> Result<Self, Self::Error> {
        Self::new(raw.width, raw.height)
    }
}

impl Resolution {
    /// Create a new Resolution with validation.
    pub fn new(width: u16, height: u16) -> Result<Self, HardValidationError> {
        if width == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "width",
                value: "0".to_string(),
                reason: "Width must be greater than 0".to_string(),
            });
        }
        if height == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "height",
                value: "0".to_string(),
                reason: "Height must be greater than 0".to_string(),
            });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Number of cells in the pixel grid.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether `(x, y)` lies on the canvas.
    #[inline]
    pub fn contains(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    /// Row-major index of `(x, y)`. Does not check bounds.
    #[inline]
    pub fn index(&self, x: u16, y: u16) -> usize {
        x as usize + y as usize * self.width as usize
    }

    /// Inverse of [`Resolution::index`].
    #[inline]
    pub fn coords(&self, index: usize) -> (u16, u16) {
        let width = self.width as usize;
        ((index % width) as u16, (index / width) as u16)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_name_valid() {
        assert_eq!(SegmentName::new("/pixelflut").unwrap().as_str(), "/pixelflut");
        assert_eq!(SegmentName::new("pixelflut").unwrap().as_str(), "/pixelflut");
    }

    #[test]
    fn test_segment_name_invalid() {
        assert!(SegmentName::new("").is_err());
        assert!(SegmentName::new("/").is_err());
        assert!(SegmentName::new("pixel\0flut").is_err());
        assert!(SegmentName::new("a".repeat(300)).is_err());
        assert!(matches!(
            SegmentName::new("pixel\0flut"),
            Err(HardValidationError::InvalidSegmentName { .. })
        ));
    }

    #[test]
    fn test_resolution_valid() {
        let res = Resolution::new(1920, 1080).unwrap();
        assert_eq!(res.pixel_count(), 1920 * 1080);
        assert_eq!(res.to_string(), "1920x1080");
    }

    #[test]
    fn test_resolution_invalid() {
        assert!(Resolution::new(0, 10).is_err());
        assert!(Resolution::new(10, 0).is_err());
    }

    #[test]
    fn test_resolution_deserialize_validates() {
        let res: Resolution = serde_json::from_str(r#"{"width":4,"height":3}"#).unwrap();
        assert_eq!(res, Resolution::new(4, 3).unwrap());

        assert!(serde_json::from_str::<Resolution>(r#"{"width":0,"height":0}"#).is_err());
        assert!(serde_json::from_str::<Resolution>(r#"{"width":0,"height":3}"#).is_err());
        assert!(serde_json::from_str::<Resolution>(r#"{"width":4,"height":0}"#).is_err());
    }

    #[test]
    fn test_segment_name_deserialize_validates() {
        let name: SegmentName = serde_json::from_str("\"pixelflut\"").unwrap();
        assert_eq!(name.as_str(), "/pixelflut");
        assert!(serde_json::from_str::<SegmentName>("\"\"").is_err());
    }

    #[test]
    fn test_resolution_row_major_index() {
        let res = Resolution::new(4, 3).unwrap();
        assert_eq!(res.index(0, 0), 0);
        assert_eq!(res.index(3, 0), 3);
        assert_eq!(res.index(0, 1), 4);
        assert_eq!(res.index(3, 2), 11);
        assert_eq!(res.coords(11), (3, 2));
        assert_eq!(res.coords(4), (0, 1));
    }

    #[test]
    fn test_resolution_contains() {
        let res = Resolution::new(4, 3).unwrap();
        assert!(res.contains(3, 2));
        assert!(!res.contains(4, 0));
        assert!(!res.contains(0, 3));
        assert!(!res.contains(u16::MAX, u16::MAX));
    }
}
