//! # `LaminarDB` Slicing
//!
//! Slice assignment for `LaminarDB` windowed aggregations.
//!
//! Every windowed aggregate is stored per *slice*, the smallest time bucket
//! windows are built from. This crate decides which slice a record lands in,
//! which slices make up a window, how session slices merge, and when a slice
//! can be dropped.
//!
//! This crate provides:
//! - **Slicing**: Tumbling, hopping, cumulative and session assigners
//! - **Merge**: Session merge decisions delivered through a callback
//! - **Expiration**: Safe slice cleanup after a window fires
//! - **Time**: Clocks and DST-aware time zone shifting
//! - **Batch**: Assignment over Arrow record batches
//!
//! ## Example
//!
//! ```rust
//! use laminar_slicing::config::WindowConfig;
//! use laminar_slicing::slicing::SliceAssigner;
//! use laminar_slicing::time::ManualClock;
//!
//! const MINUTE: i64 = 60_000;
//!
//! let assigner = WindowConfig::tumbling(10 * MINUTE).build()?;
//! let clock = ManualClock::new(0);
//!
//! // 12:07 -> slice ending 12:10, window [12:00, 12:10)
//! let slice_end = assigner.assign_slice_end(727 * MINUTE, &clock);
//! assert_eq!(slice_end, 730 * MINUTE);
//! assert_eq!(assigner.window_start(slice_end), 720 * MINUTE);
//! # Ok::<(), laminar_slicing::Error>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod config;
pub mod expiration;
pub mod merge;
pub mod slicing;
pub mod state;
pub mod time;

// Re-export key types
pub use config::{ConfigError, WindowConfig};
pub use expiration::ExpirationCalculator;
pub use merge::{MergeCallback, MergeGroup};
pub use slicing::{SliceAssigner, SliceAssigners, TimeWindow};

/// Result type for laminar-slicing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for laminar-slicing
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid window configuration
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// Batch assignment errors
    #[error("Batch error: {0}")]
    Batch(#[from] batch::BatchError),
}
