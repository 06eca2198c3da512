//! pixelshm Core Library
//!
//! Cross-process pixel canvas backed by a named POSIX shared memory segment.
//! A packet-processing backend writes pixels and per-port statistics; display
//! frontends attach to the same segment and read them without copying.

pub mod config;
pub mod error;
pub mod shm;
pub mod summary;
pub mod types;

// Re-export commonly used types
pub use config::{AttachConfig, CanvasConfig, ConfigLoader, ConfigOverrides};
pub use error::{CanvasError, CanvasResult, HardValidationError, OpenError, StatsError};
pub use shm::{Attachment, PortStatsTable, SharedCanvas, StatsLayout};
pub use summary::CanvasSummary;
pub use types::{Resolution, SegmentName};
