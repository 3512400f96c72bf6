//! One-shot flush timer.
//!
//! The timer holds at most one pending deadline, on the monotonic time scale
//! of [`Clock::monotonic_millis`](crate::clock::Clock::monotonic_millis).
//! It never runs callbacks on its own: whoever owns the event loop asks for
//! [`FlushTimer::remaining`], sleeps that long, and calls back into the
//! window manager, which checks [`FlushTimer::is_due`]. Cancelling clears
//! the deadline, so a wake-up that arrives after a manual flush finds
//! nothing to do.

use std::time::Duration;

use tracing::trace;

/// A cancellable, arm-once deadline in monotonic milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushTimer {
    deadline: Option<u64>,
    arm_count: u64,
}

impl FlushTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer for `now + duration` unless it is already armed.
    ///
    /// Returns `true` if this call armed the timer.
    pub fn arm(&mut self, now: u64, duration: Duration) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let deadline = now.saturating_add(millis);
        self.deadline = Some(deadline);
        self.arm_count += 1;
        trace!(deadline, "Flush timer armed");
        true
    }

    /// Clears the pending deadline, returning it if one was set.
    pub fn cancel(&mut self) -> Option<u64> {
        let cancelled = self.deadline.take();
        if let Some(deadline) = cancelled {
            trace!(deadline, "Flush timer cancelled");
        }
        cancelled
    }

    #[must_use]
    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left until the deadline, zero once it has passed.
    #[must_use]
    pub fn remaining(&self, now: u64) -> Option<Duration> {
        self.deadline
            .map(|deadline| Duration::from_millis(deadline.saturating_sub(now)))
    }

    /// Returns `true` if the timer is armed and its deadline has passed.
    #[must_use]
    pub fn is_due(&self, now: u64) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }

    /// How many times the timer has been armed since creation.
    #[must_use]
    pub fn arm_count(&self) -> u64 {
        self.arm_count
    }
}

pub(crate) fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_sets_deadline_once() {
        let mut timer = FlushTimer::new();
        assert!(timer.arm(1_000, Duration::from_secs(60)));
        assert!(!timer.arm(5_000, Duration::from_secs(60)));

        assert_eq!(timer.deadline(), Some(61_000));
        assert_eq!(timer.arm_count(), 1);
    }

    #[test]
    fn cancel_clears_deadline() {
        let mut timer = FlushTimer::new();
        timer.arm(0, Duration::from_millis(10));

        assert_eq!(timer.cancel(), Some(10));
        assert!(!timer.is_armed());
        assert_eq!(timer.cancel(), None);
    }

    #[test]
    fn rearm_after_cancel() {
        let mut timer = FlushTimer::new();
        timer.arm(0, Duration::from_millis(10));
        timer.cancel();
        assert!(timer.arm(20, Duration::from_millis(10)));
        assert_eq!(timer.deadline(), Some(30));
        assert_eq!(timer.arm_count(), 2);
    }

    #[test]
    fn is_due_only_when_armed_and_elapsed() {
        let mut timer = FlushTimer::new();
        assert!(!timer.is_due(u64::MAX));

        timer.arm(0, Duration::from_millis(100));
        assert!(!timer.is_due(99));
        assert!(timer.is_due(100));
        assert!(timer.is_due(101));
    }

    #[test]
    fn remaining_counts_down_to_zero() {
        let mut timer = FlushTimer::new();
        assert_eq!(timer.remaining(0), None);

        timer.arm(100, Duration::from_millis(50));
        assert_eq!(timer.remaining(120), Some(Duration::from_millis(30)));
        assert_eq!(timer.remaining(500), Some(Duration::ZERO));
    }

    #[test]
    fn huge_duration_saturates() {
        let mut timer = FlushTimer::new();
        timer.arm(10, Duration::MAX);
        assert_eq!(timer.deadline(), Some(u64::MAX));
    }
}
