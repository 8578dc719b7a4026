//! # Fibonacci Backoff
//!
//! Progressive requeue delays for failed reconciles. Grows more slowly
//! than exponential backoff, which suits external kops operations that
//! routinely need several retries while cloud resources converge.
//!
//! The sequence is computed in minutes (1m, 1m, 2m, 3m, 5m, 8m, 10m max)
//! and returned in seconds for the requeue action.

/// Fibonacci backoff calculator.
///
/// Each backoff is the sum of the previous two, capped at the maximum.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// Creates a backoff bounded by `min_minutes` and `max_minutes`.
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Returns the current backoff in seconds and advances the sequence.
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result_seconds = self.current_minutes * 60;

        let next_minutes = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = std::cmp::min(next_minutes, self.max_minutes);

        result_seconds
    }

    /// Resets to the initial state, for use after a successful reconcile.
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}
