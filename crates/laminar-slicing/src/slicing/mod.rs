//! # Slice Assigners
//!
//! A *slice* is the smallest addressable time bucket of a windowed
//! aggregation. It has no identity beyond its exclusive end timestamp: the
//! slice end *is* the key under which the state backend keeps the slice's
//! aggregate. Windows are derived from slices and never stored.
//!
//! ## Assigner Types
//!
//! - **Tumbling**: one slice per window, `[start, start + size)`
//! - **Hopping**: slices of `slide` width, each window spans `size / slide` slices
//! - **Cumulative**: slices of `step` width, windows grow from the cycle start
//!   in `step` increments up to `max_size`
//! - **Session**: one slice per record, `[t, t + gap)`, merged on overlap
//!
//! ## Example
//!
//! ```rust
//! use laminar_slicing::slicing::{HoppingSliceAssigner, SliceAssigner};
//! use laminar_slicing::time::ManualClock;
//!
//! const MINUTE: i64 = 60_000;
//!
//! let assigner = HoppingSliceAssigner::from_millis(10 * MINUTE, 5 * MINUTE).unwrap();
//! let clock = ManualClock::new(0);
//!
//! // 12:07 lands in the slice (12:05, 12:10]
//! let slice_end = assigner.assign_slice_end(727 * MINUTE, &clock);
//! assert_eq!(slice_end, 730 * MINUTE);
//! assert_eq!(assigner.window_start(slice_end), 720 * MINUTE);
//! ```

mod assigners;
mod cumulative;
mod hopping;
mod session;
mod tumbling;

pub use assigners::SliceAssigners;
pub use cumulative::CumulativeSliceAssigner;
pub use hopping::HoppingSliceAssigner;
pub use session::SessionSliceAssigner;
pub use tumbling::TumblingSliceAssigner;

use std::fmt;
use std::iter::FusedIterator;
use std::time::Duration;

use smallvec::SmallVec;

use crate::config::ConfigError;
use crate::time::{ClockService, ShiftTimeZone, TimeAttribute};

/// Collection type for slice end lists.
///
/// Uses `SmallVec` to avoid heap allocation for the common case of a merge or
/// expiration touching a handful of slices.
pub type SliceEndVec = SmallVec<[i64; 4]>;

/// A half-open time interval `[start, end)` in milliseconds.
///
/// Windows are derived from slice ends; a `TimeWindow` is what the trigger
/// layer reports to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeWindow {
    /// Window start timestamp (inclusive, in milliseconds)
    pub start: i64,
    /// Window end timestamp (exclusive, in milliseconds)
    pub end: i64,
}

impl TimeWindow {
    /// Creates a new window.
    #[inline]
    #[must_use]
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Returns the window duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        self.end - self.start
    }

    /// Returns the largest timestamp that still belongs to this window.
    #[must_use]
    pub fn max_timestamp(&self) -> i64 {
        self.end - 1
    }

    /// Checks whether `timestamp` falls inside `[start, end)`.
    #[inline]
    #[must_use]
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Checks whether two windows overlap or touch.
    ///
    /// Touching counts: two session windows `[0, 5)` and `[5, 10)` belong to
    /// records exactly one gap apart and must merge.
    #[inline]
    #[must_use]
    pub fn intersects(&self, other: &TimeWindow) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    /// Returns the smallest window covering both.
    #[inline]
    #[must_use]
    pub fn cover(&self, other: &TimeWindow) -> TimeWindow {
        TimeWindow::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A lazy, finite, ascending sequence of slice ends.
///
/// Returned by [`SliceAssigner::expired_slices`] and
/// [`SliceAssigner::window_slices`]. It is a pure function of its inputs;
/// calling the producing method again restarts the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceEnds {
    next: i64,
    step: i64,
    remaining: usize,
}

impl SliceEnds {
    /// An empty sequence.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            next: 0,
            step: 0,
            remaining: 0,
        }
    }

    /// A sequence yielding exactly `slice_end`.
    #[must_use]
    pub fn single(slice_end: i64) -> Self {
        Self {
            next: slice_end,
            step: 0,
            remaining: 1,
        }
    }

    /// `count` slice ends starting at `first`, spaced `step` apart.
    #[must_use]
    pub fn range(first: i64, step: i64, count: usize) -> Self {
        Self {
            next: first,
            step,
            remaining: count,
        }
    }
}

impl Iterator for SliceEnds {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next;
        self.remaining -= 1;
        self.next = self.next.saturating_add(self.step);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SliceEnds {}

impl FusedIterator for SliceEnds {}

/// Capability shared by every slice assigner: assign, bound-query, expire.
///
/// All methods are pure. Implementations hold only immutable configuration
/// and are safe to call on the per-record hot path.
///
/// Slice ends produced by an assigner with a non-UTC [`ShiftTimeZone`] are in
/// local millis; use [`SliceAssigner::window_end_to_epoch_millis`] to turn
/// them back into instants for timer registration.
pub trait SliceAssigner: Send + Sync {
    /// Returns whether this assigner slices by event or processing time.
    fn time_attribute(&self) -> TimeAttribute;

    /// Returns the zone the slice grid is aligned to.
    fn shift_time_zone(&self) -> ShiftTimeZone;

    /// Maps a timestamp that is already in local millis to its slice end.
    fn slice_end_of(&self, local_ms: i64) -> i64;

    /// Recovers the start of the window ending at `window_end`.
    fn window_start(&self, window_end: i64) -> i64;

    /// Returns the end of the last window that contains the slice.
    fn last_window_end(&self, slice_end: i64) -> i64;

    /// Returns the slices that became unreachable once the window ending at
    /// `window_end` fired.
    ///
    /// Every yielded id is at or below `window_end - retention`, so the
    /// slice lies entirely before the oldest window still reachable.
    fn expired_slices(&self, window_end: i64) -> SliceEnds;

    /// Returns the slices whose state composes the window ending at
    /// `window_end`, in ascending order.
    fn window_slices(&self, window_end: i64) -> SliceEnds;

    /// Returns the spacing between consecutive slice ends, or `None` when
    /// slice ends are not on a grid (sessions).
    fn slice_end_interval(&self) -> Option<i64>;

    /// Returns the next window end the trigger layer should fire after
    /// `window_end` for the same series of slices, if any.
    fn next_trigger_window(&self, window_end: i64) -> Option<i64>;

    /// Returns how far behind a closed window end slice state must be kept.
    fn retention_ms(&self) -> i64;

    /// Returns true when slicing by event time.
    #[inline]
    fn is_event_time(&self) -> bool {
        self.time_attribute() == TimeAttribute::EventTime
    }

    /// Assigns a record to its slice.
    ///
    /// Event-time assigners use `timestamp`; processing-time assigners
    /// substitute the clock's current reading. The instant is shifted into
    /// local millis before bucketing.
    #[inline]
    fn assign_slice_end(&self, timestamp: i64, clock: &dyn ClockService) -> i64 {
        let instant = match self.time_attribute() {
            TimeAttribute::EventTime => timestamp,
            TimeAttribute::ProcessingTime => clock.current_processing_time(),
        };
        self.slice_end_of(self.shift_time_zone().to_local_millis(instant))
    }

    /// Returns the window ending at `window_end`.
    #[must_use]
    fn window(&self, window_end: i64) -> TimeWindow {
        TimeWindow::new(self.window_start(window_end), window_end)
    }

    /// Converts a local window end into the UTC instant at which it closes.
    ///
    /// An end inside a repeated fall-back hour closes at its later instant,
    /// so records from both passes of the hour reach the window first.
    fn window_end_to_epoch_millis(&self, window_end: i64) -> i64 {
        self.shift_time_zone().to_fire_millis(window_end)
    }
}

/// Converts a `Duration` into signed milliseconds.
pub(crate) fn duration_millis(what: &'static str, duration: Duration) -> Result<i64, ConfigError> {
    i64::try_from(duration.as_millis()).map_err(|_| ConfigError::DurationOutOfRange { what })
}

/// Checks `|offset| < bound`.
pub(crate) fn offset_in_range(offset_ms: i64, bound_ms: i64) -> bool {
    offset_ms.unsigned_abs() < bound_ms.unsigned_abs()
}

/// Converts an interval ratio to a count; ratios are validated at
/// construction so this never truncates in practice.
pub(crate) fn slice_count(span_ms: i64, interval_ms: i64) -> usize {
    if interval_ms <= 0 || span_ms <= 0 {
        return 0;
    }
    usize::try_from(span_ms / interval_ms).unwrap_or(usize::MAX)
}
