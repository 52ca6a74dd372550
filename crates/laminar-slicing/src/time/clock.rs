//! Clock abstraction for processing-time slicing.
//!
//! Processing-time assigners never read the wall clock directly; they ask a
//! [`ClockService`]. Event-time assigners ignore the clock entirely.

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current processing time.
///
/// Implemented by [`SystemClock`] for production, [`ManualClock`] for tests,
/// and by any `Fn() -> i64` closure.
///
/// # Example
///
/// ```rust
/// use laminar_slicing::time::ClockService;
///
/// let fixed = || 42_i64;
/// assert_eq!(fixed.current_processing_time(), 42);
/// ```
pub trait ClockService: Send + Sync {
    /// Returns the current processing time in milliseconds since Unix epoch.
    fn current_processing_time(&self) -> i64;
}

impl<F> ClockService for F
where
    F: Fn() -> i64 + Send + Sync,
{
    #[inline]
    fn current_processing_time(&self) -> i64 {
        self()
    }
}

/// Wall clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Creates a new system clock.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ClockService for SystemClock {
    #[inline]
    fn current_processing_time(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
///
/// Shared by reference between the test and the assigner; interior
/// mutability keeps the [`ClockService`] contract `&self`.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    /// Creates a manual clock reading `now_ms`.
    #[must_use]
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Advances the clock by `delta_ms` and returns the new reading.
    pub fn advance(&self, delta_ms: i64) -> i64 {
        self.now_ms.fetch_add(delta_ms, Ordering::Relaxed) + delta_ms
    }
}

impl ClockService for ManualClock {
    #[inline]
    fn current_processing_time(&self) -> i64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_set_and_advance() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.current_processing_time(), 1_000);

        clock.set(5_000);
        assert_eq!(clock.current_processing_time(), 5_000);

        assert_eq!(clock.advance(250), 5_250);
        assert_eq!(clock.current_processing_time(), 5_250);
    }

    #[test]
    fn test_closure_clock() {
        let clock = || 7_i64;
        assert_eq!(clock.current_processing_time(), 7);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock::new().current_processing_time() > 1_577_836_800_000);
    }

    #[test]
    fn test_clock_as_trait_object() {
        let clock = ManualClock::new(99);
        let dyn_clock: &dyn ClockService = &clock;
        assert_eq!(dyn_clock.current_processing_time(), 99);
    }
}
