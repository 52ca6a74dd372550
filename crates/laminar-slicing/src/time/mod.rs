//! # Time Module
//!
//! Clocks and time zone shifting used by slice assignment.
//!
//! ## Concepts
//!
//! - **Event Time**: Timestamp carried by the record
//! - **Processing Time**: Reading of a [`ClockService`] when the record is assigned
//! - **Local Millis**: A UTC instant shifted by its zone's offset, see [`ShiftTimeZone`]
//!
//! All timestamps are `i64` milliseconds since Unix epoch.

mod clock;
mod zone;

pub use clock::{ClockService, ManualClock, SystemClock};
pub use zone::ShiftTimeZone;

use serde::{Deserialize, Serialize};

/// Whether an assigner slices by event time or by processing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeAttribute {
    /// Slice by the record's own timestamp.
    #[default]
    EventTime,
    /// Slice by the clock reading at assignment time.
    ProcessingTime,
}

/// Returns the start of the grid cell of width `interval` containing
/// `timestamp`, with cells anchored at `offset`.
///
/// Floors correctly for negative timestamps and offsets. The remainder is
/// taken in `i128` so `timestamp - offset` never wraps; a start below
/// `i64::MIN` saturates.
///
/// # Example
///
/// ```rust
/// use laminar_slicing::time::window_start_with_offset;
///
/// assert_eq!(window_start_with_offset(1_500, 0, 1_000), 1_000);
/// assert_eq!(window_start_with_offset(-1, 0, 1_000), -1_000);
/// assert_eq!(window_start_with_offset(1_500, 200, 1_000), 1_200);
/// ```
#[inline]
#[must_use]
pub fn window_start_with_offset(timestamp: i64, offset: i64, interval: i64) -> i64 {
    let remainder = (i128::from(timestamp) - i128::from(offset)).rem_euclid(i128::from(interval));
    // 0 <= remainder < interval
    let remainder = i64::try_from(remainder).unwrap_or(interval);
    timestamp.saturating_sub(remainder)
}
