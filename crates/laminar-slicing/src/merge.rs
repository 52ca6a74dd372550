//! # Merge Protocol
//!
//! Session slices are not on a grid; when a new record's slice touches
//! existing open sessions the state backend has to fold them together. The
//! assigner decides *which* slices merge and into which id. The caller
//! decides *how* state moves, through a [`MergeCallback`].

use crate::slicing::{SliceEndVec, TimeWindow};

/// One merge decision: fold `to_be_merged` into `result_slice_end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroup {
    result_slice_end: i64,
    window: TimeWindow,
    to_be_merged: SliceEndVec,
}

impl MergeGroup {
    pub(crate) fn new(window: TimeWindow, mut to_be_merged: SliceEndVec) -> Self {
        to_be_merged.sort_unstable();
        to_be_merged.dedup();
        Self {
            result_slice_end: window.end,
            window,
            to_be_merged,
        }
    }

    /// Canonical id of the merged session: the largest end in the group.
    #[inline]
    #[must_use]
    pub fn result_slice_end(&self) -> i64 {
        self.result_slice_end
    }

    /// Bounds of the merged session.
    #[inline]
    #[must_use]
    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Previously open slice ids absorbed by this merge, ascending.
    ///
    /// Empty when the new slice touched nothing. Contains the result id
    /// itself when the result was already an open session.
    #[inline]
    #[must_use]
    pub fn to_be_merged(&self) -> &[i64] {
        &self.to_be_merged
    }

    /// Returns true when no open session was touched.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.to_be_merged.is_empty()
    }

    /// Returns true if `slice_end` is the result or one of the absorbed ids.
    #[must_use]
    pub fn involves(&self, slice_end: i64) -> bool {
        slice_end == self.result_slice_end || self.to_be_merged.binary_search(&slice_end).is_ok()
    }
}

/// Receives merge decisions from
/// [`SessionSliceAssigner::merge_slices`](crate::slicing::SessionSliceAssigner::merge_slices).
///
/// Invoked exactly once per call. An error aborts the merge and is returned
/// to the caller unchanged.
///
/// Any `FnMut(&MergeGroup) -> Result<(), E>` closure is a callback.
pub trait MergeCallback {
    /// Error raised by the state backend while moving state.
    type Error;

    /// Folds the absorbed slices' state into the result slice.
    ///
    /// # Errors
    ///
    /// Whatever the state backend reports.
    fn merge(&mut self, group: &MergeGroup) -> Result<(), Self::Error>;
}

impl<F, E> MergeCallback for F
where
    F: FnMut(&MergeGroup) -> Result<(), E>,
{
    type Error = E;

    #[inline]
    fn merge(&mut self, group: &MergeGroup) -> Result<(), E> {
        self(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_merge_group_sorts_and_dedups() {
        let group = MergeGroup::new(TimeWindow::new(0, 30), smallvec![30, 10, 20, 10]);
        assert_eq!(group.result_slice_end(), 30);
        assert_eq!(group.to_be_merged(), &[10, 20, 30]);
        assert!(!group.is_singleton());
        assert!(group.involves(20));
        assert!(!group.involves(25));
    }

    #[test]
    fn test_merge_group_singleton() {
        let group = MergeGroup::new(TimeWindow::new(5, 10), SliceEndVec::new());
        assert!(group.is_singleton());
        assert!(group.involves(10));
        assert_eq!(group.window(), TimeWindow::new(5, 10));
    }

    #[test]
    fn test_closure_callback_propagates_error() {
        let group = MergeGroup::new(TimeWindow::new(0, 1), SliceEndVec::new());
        let mut failing = |_: &MergeGroup| -> Result<(), String> { Err("backend down".into()) };
        assert_eq!(failing.merge(&group), Err("backend down".to_string()));

        let mut seen = Vec::new();
        let mut recording = |g: &MergeGroup| -> Result<(), ()> {
            seen.push(g.result_slice_end());
            Ok(())
        };
        recording.merge(&group).unwrap();
        assert_eq!(seen, vec![1]);
    }
}
