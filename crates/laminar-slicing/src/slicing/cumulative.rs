//! Cumulative slice assigner.
//!
//! A cumulative window fires every `step` over a growing range that resets
//! each `max_size`: with `max_size = 1 day` and `step = 1 hour` it emits
//! `[00:00, 01:00)`, `[00:00, 02:00)`, ... `[00:00, 24:00)` and then starts
//! over. Slices are `step` wide; all slices of a cycle stay alive until the
//! cycle's final window fires.

use std::time::Duration;

use super::{duration_millis, offset_in_range, slice_count, SliceAssigner, SliceEnds};
use crate::config::ConfigError;
use crate::time::{window_start_with_offset, ShiftTimeZone, TimeAttribute};

/// Slices time for windows that grow by `step` up to `max_size`.
///
/// Requires `max_size % step == 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CumulativeSliceAssigner {
    max_size_ms: i64,
    step_ms: i64,
    offset_ms: i64,
    zone: ShiftTimeZone,
    time_attribute: TimeAttribute,
}

impl CumulativeSliceAssigner {
    /// Creates a new cumulative slice assigner.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either duration is zero, does not fit in
    /// `i64` milliseconds, or `max_size` is not a multiple of `step`.
    pub fn new(max_size: Duration, step: Duration) -> Result<Self, ConfigError> {
        Self::from_millis(
            duration_millis("max_size", max_size)?,
            duration_millis("step", step)?,
        )
    }

    /// Creates a new cumulative slice assigner with millisecond parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidStep`] if either value is not positive
    /// and [`ConfigError::MaxSizeNotMultipleOfStep`] if `max_size % step != 0`.
    pub fn from_millis(max_size_ms: i64, step_ms: i64) -> Result<Self, ConfigError> {
        if max_size_ms <= 0 || step_ms <= 0 {
            return Err(ConfigError::InvalidStep {
                max_size_ms,
                step_ms,
            });
        }
        if max_size_ms % step_ms != 0 {
            return Err(ConfigError::MaxSizeNotMultipleOfStep {
                max_size_ms,
                step_ms,
            });
        }
        Ok(Self {
            max_size_ms,
            step_ms,
            offset_ms: 0,
            zone: ShiftTimeZone::Utc,
            time_attribute: TimeAttribute::EventTime,
        })
    }

    /// Shifts both the cycle and the step grid by `offset_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOffset`] unless `|offset| < max_size`.
    pub fn with_offset(mut self, offset_ms: i64) -> Result<Self, ConfigError> {
        if !offset_in_range(offset_ms, self.max_size_ms) {
            return Err(ConfigError::InvalidOffset {
                window: "Cumulative",
                offset_ms,
                bound_ms: self.max_size_ms,
            });
        }
        self.offset_ms = offset_ms;
        Ok(self)
    }

    /// Aligns the cycle to local time of `zone`.
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

    /// Returns the maximum window size in milliseconds.
    #[must_use]
    pub fn max_size_ms(&self) -> i64 {
        self.max_size_ms
    }

    /// Returns the step in milliseconds.
    #[must_use]
    pub fn step_ms(&self) -> i64 {
        self.step_ms
    }

    /// Returns the grid offset in milliseconds.
    #[must_use]
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    /// Returns the end of the cycle that the window ending at `window_end`
    /// belongs to.
    #[inline]
    fn cycle_end(&self, window_end: i64) -> i64 {
        self.window_start(window_end).saturating_add(self.max_size_ms)
    }
}

impl SliceAssigner for CumulativeSliceAssigner {
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
        window_start_with_offset(local_ms, self.offset_ms, self.step_ms).saturating_add(self.step_ms)
    }

    fn window_start(&self, window_end: i64) -> i64 {
        // the end is exclusive, so a cycle-final end belongs to its own cycle
        window_start_with_offset(window_end.saturating_sub(1), self.offset_ms, self.max_size_ms)
    }

    fn last_window_end(&self, slice_end: i64) -> i64 {
        self.cycle_end(slice_end)
    }

    fn expired_slices(&self, window_end: i64) -> SliceEnds {
        let window_start = self.window_start(window_end);
        if window_end != window_start.saturating_add(self.max_size_ms) {
            return SliceEnds::empty();
        }
        // the cycle before this one is no longer reachable
        let first = window_start
            .saturating_sub(self.max_size_ms)
            .saturating_add(self.step_ms);
        SliceEnds::range(first, self.step_ms, slice_count(self.max_size_ms, self.step_ms))
    }

    fn window_slices(&self, window_end: i64) -> SliceEnds {
        let window_start = self.window_start(window_end);
        let count = slice_count(window_end.saturating_sub(window_start), self.step_ms);
        SliceEnds::range(window_start.saturating_add(self.step_ms), self.step_ms, count)
    }

    fn slice_end_interval(&self) -> Option<i64> {
        Some(self.step_ms)
    }

    fn next_trigger_window(&self, window_end: i64) -> Option<i64> {
        let next = window_end.saturating_add(self.step_ms);
        (next <= self.cycle_end(window_end)).then_some(next)
    }

    fn retention_ms(&self) -> i64 {
        self.max_size_ms
    }
}
