//! Per-slice aggregate state.
//!
//! A slice accumulator holds the partial aggregate of the records assigned to
//! one slice. Windows are never aggregated directly: a window's value is the
//! merge of its slices, and a session merge folds the absorbed slices into
//! the result slice. Both paths go through [`SliceAccumulator::merge`].

/// Partial aggregate of one slice.
pub trait SliceAccumulator: Default + Clone + Send {
    /// Value carried by a record assigned to the slice.
    type Input;
    /// Value reported when a window over the slice fires.
    type Output;

    /// Folds one assigned record into the slice.
    fn add(&mut self, value: Self::Input);

    /// Folds another slice's partial aggregate into this one.
    ///
    /// Merge order is not fixed. Window assembly merges slices in ascending
    /// order, session merges fold the absorbed ids in group order.
    fn merge(&mut self, other: &Self);

    /// Value of the window whose slices have been merged into `self`.
    fn result(&self) -> Self::Output;

    /// Number of records assigned to the slice, including merged slices.
    fn record_count(&self) -> u64;

    /// Returns true when no record has landed in the slice.
    ///
    /// An empty slice contributes nothing to any window it belongs to.
    fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

/// `COUNT(*)` over a slice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountAccumulator {
    records: u64,
}

impl SliceAccumulator for CountAccumulator {
    type Input = ();
    type Output = u64;

    fn add(&mut self, (): ()) {
        self.records = self.records.saturating_add(1);
    }

    fn merge(&mut self, other: &Self) {
        self.records = self.records.saturating_add(other.records);
    }

    fn result(&self) -> u64 {
        self.records
    }

    fn record_count(&self) -> u64 {
        self.records
    }
}

/// `SUM(value)` over a slice, saturating at the `i64` bounds.
///
/// Keeps its own record count so a slice whose values cancel out to zero
/// still reports as non-empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SumAccumulator {
    sum: i64,
    records: u64,
}

impl SliceAccumulator for SumAccumulator {
    type Input = i64;
    type Output = i64;

    fn add(&mut self, value: i64) {
        self.sum = self.sum.saturating_add(value);
        self.records = self.records.saturating_add(1);
    }

    fn merge(&mut self, other: &Self) {
        self.sum = self.sum.saturating_add(other.sum);
        self.records = self.records.saturating_add(other.records);
    }

    fn result(&self) -> i64 {
        self.sum
    }

    fn record_count(&self) -> u64 {
        self.records
    }
}
