//! Closed set of slice assigners selected at construction.

use super::{
    CumulativeSliceAssigner, HoppingSliceAssigner, SessionSliceAssigner, SliceAssigner,
    SliceEnds, TumblingSliceAssigner,
};
use crate::time::{ShiftTimeZone, TimeAttribute};

/// Any of the four slice assigners.
///
/// Operators hold one of these so that the per-record path dispatches with a
/// `match` instead of a vtable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceAssigners {
    /// Fixed-size, non-overlapping windows
    Tumbling(TumblingSliceAssigner),
    /// Fixed-size windows advancing by a slide
    Hopping(HoppingSliceAssigner),
    /// Windows growing by a step up to a max size
    Cumulative(CumulativeSliceAssigner),
    /// Gap-separated activity sessions
    Session(SessionSliceAssigner),
}

macro_rules! dispatch {
    ($self:ident, $inner:ident => $body:expr) => {
        match $self {
            SliceAssigners::Tumbling($inner) => $body,
            SliceAssigners::Hopping($inner) => $body,
            SliceAssigners::Cumulative($inner) => $body,
            SliceAssigners::Session($inner) => $body,
        }
    };
}

impl SliceAssigners {
    /// Returns the session assigner if slices of this kind need merging.
    #[must_use]
    pub fn as_session(&self) -> Option<&SessionSliceAssigner> {
        match self {
            Self::Session(session) => Some(session),
            _ => None,
        }
    }

    /// Returns true for assigners whose slices merge.
    #[must_use]
    pub fn is_merging(&self) -> bool {
        matches!(self, Self::Session(_))
    }

    /// Short name of the window kind, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tumbling(_) => "tumbling",
            Self::Hopping(_) => "hopping",
            Self::Cumulative(_) => "cumulative",
            Self::Session(_) => "session",
        }
    }
}

impl SliceAssigner for SliceAssigners {
    #[inline]
    fn time_attribute(&self) -> TimeAttribute {
        dispatch!(self, a => a.time_attribute())
    }

    #[inline]
    fn shift_time_zone(&self) -> ShiftTimeZone {
        dispatch!(self, a => a.shift_time_zone())
    }

    #[inline]
    fn slice_end_of(&self, local_ms: i64) -> i64 {
        dispatch!(self, a => a.slice_end_of(local_ms))
    }

    fn window_start(&self, window_end: i64) -> i64 {
        dispatch!(self, a => a.window_start(window_end))
    }

    fn last_window_end(&self, slice_end: i64) -> i64 {
        dispatch!(self, a => a.last_window_end(slice_end))
    }

    fn expired_slices(&self, window_end: i64) -> SliceEnds {
        dispatch!(self, a => a.expired_slices(window_end))
    }

    fn window_slices(&self, window_end: i64) -> SliceEnds {
        dispatch!(self, a => a.window_slices(window_end))
    }

    fn slice_end_interval(&self) -> Option<i64> {
        dispatch!(self, a => a.slice_end_interval())
    }

    fn next_trigger_window(&self, window_end: i64) -> Option<i64> {
        dispatch!(self, a => a.next_trigger_window(window_end))
    }

    fn retention_ms(&self) -> i64 {
        dispatch!(self, a => a.retention_ms())
    }
}

impl From<TumblingSliceAssigner> for SliceAssigners {
    fn from(assigner: TumblingSliceAssigner) -> Self {
        Self::Tumbling(assigner)
    }
}

impl From<HoppingSliceAssigner> for SliceAssigners {
    fn from(assigner: HoppingSliceAssigner) -> Self {
        Self::Hopping(assigner)
    }
}

impl From<CumulativeSliceAssigner> for SliceAssigners {
    fn from(assigner: CumulativeSliceAssigner) -> Self {
        Self::Cumulative(assigner)
    }
}

impl From<SessionSliceAssigner> for SliceAssigners {
    fn from(assigner: SessionSliceAssigner) -> Self {
        Self::Session(assigner)
    }
}
