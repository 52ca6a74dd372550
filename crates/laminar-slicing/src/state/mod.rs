//! # Slice State
//!
//! A minimal in-memory slice store keyed by `(key, slice_end)`.
//!
//! Production state backends live outside this crate; this store exists so
//! the assign, merge and expire protocol can be driven end to end. It shows
//! the contract every backend has to honor:
//!
//! - state is addressed by slice end only
//! - a window's value is the merge of its [`window_slices`](crate::slicing::SliceAssigner::window_slices)
//! - session merges go through a [`MergeCallback`], see [`SliceStore::merger`]
//! - expired ids come from [`ExpirationCalculator`](crate::expiration::ExpirationCalculator)

mod accumulator;

pub use accumulator::{CountAccumulator, SliceAccumulator, SumAccumulator};

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::hash::Hash;

use fxhash::FxHashMap;

use crate::merge::{MergeCallback, MergeGroup};
use crate::slicing::{SliceEndVec, TimeWindow};

/// State held for one slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceEntry<A> {
    window: TimeWindow,
    acc: A,
}

impl<A> SliceEntry<A> {
    /// Bounds of the slice (for sessions, of the whole session).
    #[must_use]
    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// The slice's accumulator.
    #[must_use]
    pub fn accumulator(&self) -> &A {
        &self.acc
    }
}

/// In-memory slice store.
///
/// Slices per key are kept in a `BTreeMap` ordered by slice end so window
/// assembly and expiration are range scans.
#[derive(Debug)]
pub struct SliceStore<K, A> {
    keys: FxHashMap<K, BTreeMap<i64, SliceEntry<A>>>,
}

impl<K, A> Default for SliceStore<K, A> {
    fn default() -> Self {
        Self {
            keys: FxHashMap::default(),
        }
    }
}

impl<K, A> SliceStore<K, A>
where
    K: Eq + Hash + Clone,
    A: SliceAccumulator,
{
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the accumulator for `(key, slice_end)`, creating an empty one
    /// spanning `window` if absent.
    pub fn get_or_create(&mut self, key: &K, slice_end: i64, window: TimeWindow) -> &mut A {
        &mut self
            .keys
            .entry(key.clone())
            .or_default()
            .entry(slice_end)
            .or_insert_with(|| SliceEntry {
                window,
                acc: A::default(),
            })
            .acc
    }

    /// Returns the entry for `(key, slice_end)`.
    #[must_use]
    pub fn get(&self, key: &K, slice_end: i64) -> Option<&SliceEntry<A>> {
        self.keys.get(key)?.get(&slice_end)
    }

    /// Merges the given slices' accumulators, skipping absent and empty ones.
    ///
    /// Returns `None` if none of the slices hold a record.
    pub fn combine<I>(&self, key: &K, slice_ends: I) -> Option<A>
    where
        I: IntoIterator<Item = i64>,
    {
        let slices = self.keys.get(key)?;
        let mut found = false;
        let mut acc = A::default();
        for end in slice_ends {
            if let Some(entry) = slices.get(&end).filter(|entry| !entry.acc.is_empty()) {
                acc.merge(&entry.acc);
                found = true;
            }
        }
        found.then_some(acc)
    }

    /// Windows of every open slice for `key`, ascending by end.
    ///
    /// For sessions this is the open-session view expected by
    /// [`SessionSliceAssigner::merge_slices`](crate::slicing::SessionSliceAssigner::merge_slices).
    pub fn open_windows(&self, key: &K) -> impl Iterator<Item = TimeWindow> + '_ {
        self.keys
            .get(key)
            .into_iter()
            .flat_map(|slices| slices.values().map(|entry| entry.window))
    }

    /// Ids of every slice held for `key`, ascending.
    #[must_use]
    pub fn tracked_slices(&self, key: &K) -> SliceEndVec {
        self.keys
            .get(key)
            .map(|slices| slices.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Drops the given slices. Returns how many were present.
    pub fn remove_slices<I>(&mut self, key: &K, slice_ends: I) -> usize
    where
        I: IntoIterator<Item = i64>,
    {
        let Some(slices) = self.keys.get_mut(key) else {
            return 0;
        };
        let removed = slice_ends
            .into_iter()
            .filter(|end| slices.remove(end).is_some())
            .count();
        if slices.is_empty() {
            self.keys.remove(key);
        }
        removed
    }

    /// Number of slices held for `key`.
    #[must_use]
    pub fn slice_count(&self, key: &K) -> usize {
        self.keys.get(key).map_or(0, BTreeMap::len)
    }

    /// Number of keys with at least one slice.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Returns a [`MergeCallback`] that folds session slices of `key`.
    pub fn merger(&mut self, key: K) -> SliceMerger<'_, K, A> {
        SliceMerger { store: self, key }
    }
}

/// Merge callback over a [`SliceStore`].
///
/// Absorbed slices are removed and their accumulators merged into the result
/// slice, whose window is widened to the merged bounds.
#[derive(Debug)]
pub struct SliceMerger<'a, K, A> {
    store: &'a mut SliceStore<K, A>,
    key: K,
}

impl<K, A> MergeCallback for SliceMerger<'_, K, A>
where
    K: Eq + Hash + Clone,
    A: SliceAccumulator,
{
    type Error = Infallible;

    fn merge(&mut self, group: &MergeGroup) -> Result<(), Infallible> {
        let slices = self.store.keys.entry(self.key.clone()).or_default();
        let mut acc = A::default();
        for end in group.to_be_merged() {
            if let Some(entry) = slices.remove(end) {
                acc.merge(&entry.acc);
            }
        }
        slices.insert(
            group.result_slice_end(),
            SliceEntry {
                window: group.window(),
                acc,
            },
        );
        Ok(())
    }
}
