//! Hopping (sliding) slice assigner.
//!
//! Slices are `slide` wide. A window of `size` is the union of the
//! `size / slide` consecutive slices ending at the window end, so each
//! record is aggregated exactly once no matter how many windows overlap it.

use std::time::Duration;

use super::{duration_millis, offset_in_range, slice_count, SliceAssigner, SliceEnds};
use crate::config::ConfigError;
use crate::time::{window_start_with_offset, ShiftTimeZone, TimeAttribute};

/// Slices time for overlapping fixed-size windows that advance by `slide`.
///
/// Requires `size % slide == 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoppingSliceAssigner {
    /// Window size in milliseconds
    size_ms: i64,
    /// Slide interval in milliseconds (also the slice width)
    slide_ms: i64,
    offset_ms: i64,
    zone: ShiftTimeZone,
    time_attribute: TimeAttribute,
}

impl HoppingSliceAssigner {
    /// Creates a new hopping slice assigner.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either duration is zero, does not fit in
    /// `i64` milliseconds, or `size` is not a multiple of `slide`.
    pub fn new(size: Duration, slide: Duration) -> Result<Self, ConfigError> {
        Self::from_millis(duration_millis("size", size)?, duration_millis("slide", slide)?)
    }

    /// Creates a new hopping slice assigner with millisecond parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSlide`] if either value is not positive
    /// and [`ConfigError::SizeNotMultipleOfSlide`] if `size % slide != 0`.
    pub fn from_millis(size_ms: i64, slide_ms: i64) -> Result<Self, ConfigError> {
        if size_ms <= 0 || slide_ms <= 0 {
            return Err(ConfigError::InvalidSlide { size_ms, slide_ms });
        }
        if size_ms % slide_ms != 0 {
            return Err(ConfigError::SizeNotMultipleOfSlide { size_ms, slide_ms });
        }
        Ok(Self {
            size_ms,
            slide_ms,
            offset_ms: 0,
            zone: ShiftTimeZone::Utc,
            time_attribute: TimeAttribute::EventTime,
        })
    }

    /// Shifts the slice grid by `offset_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOffset`] unless `|offset| < size`.
    pub fn with_offset(mut self, offset_ms: i64) -> Result<Self, ConfigError> {
        if !offset_in_range(offset_ms, self.size_ms) {
            return Err(ConfigError::InvalidOffset {
                window: "Hopping",
                offset_ms,
                bound_ms: self.size_ms,
            });
        }
        self.offset_ms = offset_ms;
        Ok(self)
    }

    /// Aligns the grid to local time of `zone`.
    #[must_use]
    pub fn with_time_zone(mut self, zone: ShiftTimeZone) -> Self {
        self.zone = zone;
        self
    }

    /// Selects event or processing time.
    #[must_use]
    pub fn with_time_attribute(mut self, time_attribute: TimeAttribute) -> Self {
        self.time_attribute = time_attribute;
        self
    }

    /// Returns the window size in milliseconds.
    #[must_use]
    pub fn size_ms(&self) -> i64 {
        self.size_ms
    }

    /// Returns the slide interval in milliseconds.
    #[must_use]
    pub fn slide_ms(&self) -> i64 {
        self.slide_ms
    }

    /// Returns the grid offset in milliseconds.
    #[must_use]
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    /// Returns the number of slices composing one window.
    #[must_use]
    pub fn slices_per_window(&self) -> usize {
        slice_count(self.size_ms, self.slide_ms)
    }
}

impl SliceAssigner for HoppingSliceAssigner {
    #[inline]
    fn time_attribute(&self) -> TimeAttribute {
        self.time_attribute
    }

    #[inline]
    fn shift_time_zone(&self) -> ShiftTimeZone {
        self.zone
    }

    #[inline]
    fn slice_end_of(&self, local_ms: i64) -> i64 {
        window_start_with_offset(local_ms, self.offset_ms, self.slide_ms).saturating_add(self.slide_ms)
    }

    fn window_start(&self, window_end: i64) -> i64 {
        window_end.saturating_sub(self.size_ms)
    }

    fn last_window_end(&self, slice_end: i64) -> i64 {
        slice_end.saturating_sub(self.slide_ms).saturating_add(self.size_ms)
    }

    fn expired_slices(&self, window_end: i64) -> SliceEnds {
        // one slice leaves the window per slide
        SliceEnds::single(window_end.saturating_sub(self.size_ms))
    }

    fn window_slices(&self, window_end: i64) -> SliceEnds {
        let first = window_end.saturating_sub(self.size_ms).saturating_add(self.slide_ms);
        SliceEnds::range(first, self.slide_ms, self.slices_per_window())
    }

    fn slice_end_interval(&self) -> Option<i64> {
        Some(self.slide_ms)
    }

    fn next_trigger_window(&self, window_end: i64) -> Option<i64> {
        Some(window_end.saturating_add(self.slide_ms))
    }

    fn retention_ms(&self) -> i64 {
        self.size_ms
    }
}
