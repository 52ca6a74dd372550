//! # Slice Expiration
//!
//! Decides which slices a state backend may drop once a window has fired.
//!
//! A slice is safe to drop when it ends at or before `window_end - retention`,
//! where retention is the window size (tumbling, hopping), the cycle size
//! (cumulative), or the gap (session). Sessions additionally protect every id
//! in the most recent merge group while that group's result is above the
//! horizon.

use crate::merge::MergeGroup;
use crate::slicing::{SliceAssigner, SliceEndVec, SliceEnds};

/// Computes droppable slice ids for one assigner.
#[derive(Debug)]
pub struct ExpirationCalculator<'a, A: SliceAssigner + ?Sized> {
    assigner: &'a A,
}

impl<'a, A: SliceAssigner + ?Sized> ExpirationCalculator<'a, A> {
    /// Creates a calculator bound to `assigner`.
    #[must_use]
    pub fn new(assigner: &'a A) -> Self {
        Self { assigner }
    }

    /// Latest slice end that no window after `window_end` can reach.
    #[inline]
    #[must_use]
    pub fn retention_horizon(&self, window_end: i64) -> i64 {
        window_end.saturating_sub(self.assigner.retention_ms())
    }

    /// Slices released by the grid when `window_end` fires.
    ///
    /// Empty for sessions; use [`ExpirationCalculator::expired`] with the
    /// tracked slice set there.
    #[must_use]
    pub fn expired_slices(&self, window_end: i64) -> SliceEnds {
        self.assigner.expired_slices(window_end)
    }

    /// Filters `tracked` down to the ids that may be dropped after
    /// `window_end` fired.
    ///
    /// Returns ids at or below the retention horizon in ascending order,
    /// without duplicates. Ids belonging to `latest_merge` are kept while
    /// that group's result is above the horizon.
    pub fn expired<I>(
        &self,
        window_end: i64,
        tracked: I,
        latest_merge: Option<&MergeGroup>,
    ) -> SliceEndVec
    where
        I: IntoIterator<Item = i64>,
    {
        let horizon = self.retention_horizon(window_end);
        let protected = latest_merge.filter(|group| group.result_slice_end() > horizon);

        let mut expired: SliceEndVec = tracked
            .into_iter()
            .filter(|id| *id <= horizon)
            .filter(|id| protected.map_or(true, |group| !group.involves(*id)))
            .collect();
        expired.sort_unstable();
        expired.dedup();

        if !expired.is_empty() {
            tracing::debug!(window_end, horizon, count = expired.len(), "slices expired");
        }
        expired
    }
}
