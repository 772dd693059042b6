//! Bounded retry with exponential backoff for failed cycles.
//!
//! A failed cycle (transient read error, malformed book, rejected order or
//! cancel) is skipped rather than fatal. Consecutive failures back off
//! exponentially from `initial` up to `max`; one successful cycle resets both
//! the delay and the failure count. Once `max_failures` consecutive failures
//! accumulate, the budget is exhausted and the run stops.

use std::time::Duration;

/// Exponential backoff: `initial`, `2×initial`, ... capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max, current: initial }
    }

    /// Delay to wait now; doubles the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Consecutive-failure counter paired with a [`Backoff`].
#[derive(Debug, Clone)]
pub struct RetryBudget {
    backoff: Backoff,
    max_failures: u32,
    consecutive: u32,
}

impl RetryBudget {
    pub fn new(max_failures: u32, backoff: Backoff) -> Self {
        Self { backoff, max_failures, consecutive: 0 }
    }

    /// Record a failure. Returns the delay before the next attempt, or `None`
    /// once the budget is exhausted.
    pub fn on_failure(&mut self) -> Option<Duration> {
        self.consecutive += 1;
        if self.consecutive >= self.max_failures {
            None
        } else {
            Some(self.backoff.next_delay())
        }
    }

    pub fn on_success(&mut self) {
        self.consecutive = 0;
        self.backoff.reset();
    }

    /// Failures since the last success.
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_cap() {
        let mut b = Backoff::new(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(b.next_delay(), Duration::from_millis(100));
        assert_eq!(b.next_delay(), Duration::from_millis(200));
        assert_eq!(b.next_delay(), Duration::from_millis(350));
        assert_eq!(b.next_delay(), Duration::from_millis(350));
        b.reset();
        assert_eq!(b.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn budget_exhausts_after_max_consecutive_failures() {
        let backoff = Backoff::new(Duration::from_millis(10), Duration::from_secs(1));
        let mut budget = RetryBudget::new(3, backoff);

        assert_eq!(budget.on_failure(), Some(Duration::from_millis(10)));
        assert_eq!(budget.on_failure(), Some(Duration::from_millis(20)));
        assert_eq!(budget.on_failure(), None);
        assert_eq!(budget.consecutive(), 3);
    }

    #[test]
    fn success_resets_the_count_and_delay() {
        let backoff = Backoff::new(Duration::from_millis(10), Duration::from_secs(1));
        let mut budget = RetryBudget::new(3, backoff);

        budget.on_failure();
        budget.on_failure();
        budget.on_success();
        assert_eq!(budget.consecutive(), 0);
        assert_eq!(budget.on_failure(), Some(Duration::from_millis(10)));
    }
}
