// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for pixelshm.
//!
//! This module defines explicit enum error types as per coding guidelines.
//! No `Box<dyn Error>`, no `anyhow::Result` - all errors are strongly typed.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for pixelshm.
/// All errors are explicit variants - no catch-all or generic handling.
#[derive(Debug, Error)]
pub enum CanvasError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Segment Errors - No Implicit Resize or Fallback
    // =========================================================================
    #[error("Failed to open canvas: {0}")]
    Open(#[from] OpenError),

    #[error("Statistics table error: {0}")]
    Stats(#[from] StatsError),

    #[error("Pixel ({x}, {y}) is outside the {width}x{height} canvas")]
    PixelOutOfBounds {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    },

    #[error("Failed to lock segment {name}: {source}")]
    Lock {
        name: String,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Hard validation errors reject a configuration before any segment is touched.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid segment name {name:?}: {reason}")]
    InvalidSegmentName { name: String, reason: String },

    #[error("Segment layout for {width}x{height} with {max_ports} ports of {record_size} bytes overflows usize")]
    LayoutOverflow {
        width: u16,
        height: u16,
        max_ports: usize,
        record_size: usize,
    },
}

/// Failures while creating or attaching a canvas segment.
///
/// Every variant names the segment so callers can log a precise diagnostic.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("Failed to create or open shared memory {name}: {source}")]
    Access {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to stat shared memory {name}: {source}")]
    Stat {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to resize shared memory {name} to {size} bytes: {source}")]
    Resize {
        name: String,
        size: usize,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Shared memory {name} has {actual} bytes, expected {expected} for a {width}x{height} canvas; \
         producer and consumer use different resolutions (remove /dev/shm{name} to recreate it)"
    )]
    DimensionMismatch {
        name: String,
        expected: usize,
        actual: usize,
        width: u16,
        height: u16,
    },

    #[error("Failed to map shared memory {name}: {source}")]
    Map {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Shared memory {name} has width {stored}, expected {requested}")]
    WidthMismatch {
        name: String,
        stored: u16,
        requested: u16,
    },

    #[error("Shared memory {name} has height {stored}, expected {requested}")]
    HeightMismatch {
        name: String,
        stored: u16,
        requested: u16,
    },

    #[error("Shared memory {name} is too small to hold a header: {size} bytes")]
    TooSmall { name: String, size: usize },

    #[error("Shared memory {name} has no dimensions yet ({width}x{height}); is the backend running?")]
    NotInitialized {
        name: String,
        width: u16,
        height: u16,
    },
}

/// Statistics table access errors.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Port {port} is out of range (table holds {max_ports} ports)")]
    PortOutOfRange { port: usize, max_ports: usize },

    #[error("Record size mismatch: slot holds {expected} bytes, got {actual}")]
    RecordSizeMismatch { expected: usize, actual: usize },
}

/// Result type alias using CanvasError.
pub type CanvasResult<T> = Result<T, CanvasError>;
