//! Session slice assigner.
//!
//! Every record opens a provisional slice `[t, t + gap)`. Slices that touch
//! are merged through [`SessionSliceAssigner::merge_slices`], so a session's
//! id keeps moving to the right as activity continues. Session slices are
//! never expired by the grid; they close when their own window fires.

use std::time::Duration;

use smallvec::SmallVec;

use super::{duration_millis, SliceAssigner, SliceEndVec, SliceEnds, TimeWindow};
use crate::config::ConfigError;
use crate::merge::{MergeCallback, MergeGroup};
use crate::time::{ShiftTimeZone, TimeAttribute};

/// Slices time into activity sessions separated by at least `gap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSliceAssigner {
    /// Inactivity gap in milliseconds
    gap_ms: i64,
    zone: ShiftTimeZone,
    time_attribute: TimeAttribute,
}

impl SessionSliceAssigner {
    /// Creates a new session slice assigner.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the gap is zero or does not fit in `i64`
    /// milliseconds.
    pub fn new(gap: Duration) -> Result<Self, ConfigError> {
        Self::from_millis(duration_millis("gap", gap)?)
    }

    /// Creates a new session slice assigner with gap in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidGap`] if the gap is zero or negative.
    pub fn from_millis(gap_ms: i64) -> Result<Self, ConfigError> {
        if gap_ms <= 0 {
            return Err(ConfigError::InvalidGap { gap_ms });
        }
        Ok(Self {
            gap_ms,
            zone: ShiftTimeZone::Utc,
            time_attribute: TimeAttribute::EventTime,
        })
    }

    /// Shifts slice ends into local time of `zone`.
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

    /// Returns the session gap in milliseconds.
    #[must_use]
    pub fn gap_ms(&self) -> i64 {
        self.gap_ms
    }

    /// Folds a freshly assigned slice into the open sessions it touches.
    ///
    /// `open_sessions` is the caller's current view of open session windows
    /// for the key. The new slice `[slice_end - gap, slice_end)` absorbs every
    /// open window that overlaps or touches it, transitively: a window that
    /// only touches another absorbed window is absorbed too.
    ///
    /// The callback runs exactly once. Its [`MergeGroup`] carries the
    /// resulting id (the largest end in the group), the absorbed ids in
    /// ascending order, and the merged bounds. A new slice that touches
    /// nothing yields a group with no absorbed ids.
    ///
    /// # Errors
    ///
    /// Returns the callback's error unchanged.
    pub fn merge_slices<C, I>(
        &self,
        slice_end: i64,
        open_sessions: I,
        callback: &mut C,
    ) -> Result<(), C::Error>
    where
        C: MergeCallback + ?Sized,
        I: IntoIterator<Item = TimeWindow>,
    {
        let mut candidates: SmallVec<[TimeWindow; 8]> = open_sessions.into_iter().collect();
        let mut merged = self.window(slice_end);
        let mut to_be_merged = SliceEndVec::new();

        loop {
            let absorbed_before = to_be_merged.len();
            candidates.retain(|open| {
                if open.intersects(&merged) {
                    merged = merged.cover(open);
                    to_be_merged.push(open.end);
                    false
                } else {
                    true
                }
            });
            if to_be_merged.len() == absorbed_before {
                break;
            }
        }

        let group = MergeGroup::new(merged, to_be_merged);
        if group.to_be_merged().len() > 1 {
            tracing::debug!(
                slice_end,
                result = group.result_slice_end(),
                absorbed = group.to_be_merged().len(),
                "session slices merged"
            );
        }
        callback.merge(&group)
    }
}

impl SliceAssigner for SessionSliceAssigner {
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
        local_ms.saturating_add(self.gap_ms)
    }

    fn window_start(&self, window_end: i64) -> i64 {
        window_end.saturating_sub(self.gap_ms)
    }

    fn last_window_end(&self, slice_end: i64) -> i64 {
        slice_end
    }

    fn expired_slices(&self, _window_end: i64) -> SliceEnds {
        SliceEnds::empty()
    }

    fn window_slices(&self, window_end: i64) -> SliceEnds {
        SliceEnds::single(window_end)
    }

    fn slice_end_interval(&self) -> Option<i64> {
        None
    }

    fn next_trigger_window(&self, _window_end: i64) -> Option<i64> {
        None
    }

    fn retention_ms(&self) -> i64 {
        self.gap_ms
    }
}
