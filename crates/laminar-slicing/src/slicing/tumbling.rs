//! Tumbling slice assigner: one slice per window.

use std::time::Duration;

use super::{duration_millis, offset_in_range, SliceAssigner, SliceEnds, TimeWindow};
use crate::config::ConfigError;
use crate::time::{window_start_with_offset, ShiftTimeZone, TimeAttribute};

/// Slices time into fixed-size, non-overlapping windows.
///
/// Each window is exactly one slice, so a slice is expired as soon as the
/// window after it fires.
///
/// # Example
///
/// ```rust
/// use laminar_slicing::slicing::{SliceAssigner, TumblingSliceAssigner};
///
/// let assigner = TumblingSliceAssigner::from_millis(1000).unwrap();
/// assert_eq!(assigner.slice_end_of(1500), 2000);
/// assert_eq!(assigner.window_start(2000), 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TumblingSliceAssigner {
    /// Window size in milliseconds
    size_ms: i64,
    /// Grid alignment shift in milliseconds
    offset_ms: i64,
    zone: ShiftTimeZone,
    time_attribute: TimeAttribute,
}

impl TumblingSliceAssigner {
    /// Creates a new tumbling slice assigner.
    ///
    /// # Arguments
    ///
    /// * `size` - The duration of each window
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the size is zero or does not fit in `i64`
    /// milliseconds.
    pub fn new(size: Duration) -> Result<Self, ConfigError> {
        Self::from_millis(duration_millis("size", size)?)
    }

    /// Creates a new tumbling slice assigner with size in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSize`] if the size is zero or negative.
    pub fn from_millis(size_ms: i64) -> Result<Self, ConfigError> {
        if size_ms <= 0 {
            return Err(ConfigError::InvalidSize {
                window: "Tumbling",
                size_ms,
            });
        }
        Ok(Self {
            size_ms,
            offset_ms: 0,
            zone: ShiftTimeZone::Utc,
            time_attribute: TimeAttribute::EventTime,
        })
    }

    /// Shifts the window grid by `offset_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOffset`] unless `|offset| < size`.
    pub fn with_offset(mut self, offset_ms: i64) -> Result<Self, ConfigError> {
        if !offset_in_range(offset_ms, self.size_ms) {
            return Err(ConfigError::InvalidOffset {
                window: "Tumbling",
                offset_ms,
                bound_ms: self.size_ms,
            });
        }
        self.offset_ms = offset_ms;
        Ok(self)
    }

    /// Aligns the grid to local midnight of `zone`.
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

    /// Returns the grid offset in milliseconds.
    #[must_use]
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    /// Returns the window containing a local-millis timestamp.
    #[inline]
    #[must_use]
    pub fn assign(&self, local_ms: i64) -> TimeWindow {
        let start = window_start_with_offset(local_ms, self.offset_ms, self.size_ms);
        TimeWindow::new(start, start.saturating_add(self.size_ms))
    }
}

impl SliceAssigner for TumblingSliceAssigner {
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
        self.assign(local_ms).end
    }

    fn window_start(&self, window_end: i64) -> i64 {
        window_end.saturating_sub(self.size_ms)
    }

    fn last_window_end(&self, slice_end: i64) -> i64 {
        slice_end
    }

    fn expired_slices(&self, window_end: i64) -> SliceEnds {
        SliceEnds::single(window_end.saturating_sub(self.size_ms))
    }

    fn window_slices(&self, window_end: i64) -> SliceEnds {
        SliceEnds::single(window_end)
    }

    fn slice_end_interval(&self) -> Option<i64> {
        Some(self.size_ms)
    }

    fn next_trigger_window(&self, _window_end: i64) -> Option<i64> {
        None
    }

    fn retention_ms(&self) -> i64 {
        self.size_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    const MINUTE: i64 = 60_000;
    const HOUR: i64 = 60 * MINUTE;

    #[test]
    fn test_tumbling_assign_hourly() {
        let assigner = TumblingSliceAssigner::from_millis(HOUR).unwrap();
        let clock = ManualClock::new(0);

        // 12:20 -> (12:00, 13:00]
        let slice_end = assigner.assign_slice_end(12 * HOUR + 20 * MINUTE, &clock);
        assert_eq!(slice_end, 13 * HOUR);
        assert_eq!(assigner.window_start(slice_end), 12 * HOUR);
        assert_eq!(assigner.last_window_end(slice_end), 13 * HOUR);
    }

    #[test]
    fn test_tumbling_boundary_belongs_to_next_slice() {
        let assigner = TumblingSliceAssigner::from_millis(1000).unwrap();
        assert_eq!(assigner.slice_end_of(999), 1000);
        assert_eq!(assigner.slice_end_of(1000), 2000);
    }

    #[test]
    fn test_tumbling_negative_timestamps() {
        let assigner = TumblingSliceAssigner::from_millis(1000).unwrap();
        assert_eq!(assigner.assign(-1), TimeWindow::new(-1000, 0));
        assert_eq!(assigner.assign(-1000), TimeWindow::new(-1000, 0));
        assert_eq!(assigner.assign(-1001), TimeWindow::new(-2000, -1000));
    }

    #[test]
    fn test_tumbling_with_offset() {
        let assigner = TumblingSliceAssigner::from_millis(HOUR)
            .unwrap()
            .with_offset(15 * MINUTE)
            .unwrap();
        assert_eq!(assigner.slice_end_of(12 * HOUR + 20 * MINUTE), 13 * HOUR + 15 * MINUTE);
        assert_eq!(assigner.slice_end_of(12 * HOUR + 10 * MINUTE), 12 * HOUR + 15 * MINUTE);

        let negative = TumblingSliceAssigner::from_millis(HOUR)
            .unwrap()
            .with_offset(-15 * MINUTE)
            .unwrap();
        assert_eq!(negative.slice_end_of(12 * HOUR + 50 * MINUTE), 13 * HOUR + 45 * MINUTE);
    }

    #[test]
    fn test_tumbling_expiration_and_window_slices() {
        let assigner = TumblingSliceAssigner::from_millis(HOUR).unwrap();
        let expired: Vec<_> = assigner.expired_slices(13 * HOUR).collect();
        assert_eq!(expired, vec![12 * HOUR]);
        let slices: Vec<_> = assigner.window_slices(13 * HOUR).collect();
        assert_eq!(slices, vec![13 * HOUR]);
        assert_eq!(assigner.slice_end_interval(), Some(HOUR));
        assert_eq!(assigner.next_trigger_window(13 * HOUR), None);
    }

    #[test]
    fn test_tumbling_invalid_config() {
        assert!(matches!(
            TumblingSliceAssigner::from_millis(0),
            Err(ConfigError::InvalidSize { .. })
        ));
        assert!(TumblingSliceAssigner::from_millis(-5).is_err());
        assert!(matches!(
            TumblingSliceAssigner::from_millis(1000).unwrap().with_offset(1000),
            Err(ConfigError::InvalidOffset { .. })
        ));
        assert!(TumblingSliceAssigner::from_millis(1000).unwrap().with_offset(-1000).is_err());
    }

    #[test]
    fn test_tumbling_processing_time_uses_clock() {
        let assigner = TumblingSliceAssigner::new(Duration::from_secs(1))
            .unwrap()
            .with_time_attribute(TimeAttribute::ProcessingTime);
        let clock = ManualClock::new(4_200);
        assert!(!assigner.is_event_time());
        // record timestamp is ignored
        assert_eq!(assigner.assign_slice_end(i64::MIN, &clock), 5_000);
        clock.advance(1_000);
        assert_eq!(assigner.assign_slice_end(0, &clock), 6_000);
    }
}
