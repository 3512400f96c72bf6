//! Time sources.
//!
//! The window manager reads two kinds of time through the [`Clock`] trait:
//! wall-clock milliseconds for the `start`/`end` stamps it publishes, and a
//! monotonic reading for the flush deadline, so stepping the system clock
//! never stretches or shortens a window. Tests and the replay command drive
//! both explicitly with a [`ManualClock`].

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;

/// A source of wall-clock and monotonic time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;

    /// Milliseconds since an arbitrary fixed origin. Never goes backwards.
    fn monotonic_millis(&self) -> u64;
}

/// The system clock.
///
/// Monotonic time is measured from the moment the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn monotonic_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A clock that only moves when told to.
///
/// Moving the wall time forward advances the monotonic time by the same
/// amount. Stepping the wall time back leaves the monotonic time where it
/// is, the way an NTP correction would. Clones share the same underlying
/// time, so a test can keep one handle and hand another to the code under
/// test.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    wall: Arc<AtomicI64>,
    monotonic: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock whose wall and monotonic readings both start at
    /// `start_millis` (monotonic time is clamped at zero).
    #[must_use]
    pub fn new(start_millis: i64) -> Self {
        Self {
            wall: Arc::new(AtomicI64::new(start_millis)),
            monotonic: Arc::new(AtomicU64::new(u64::try_from(start_millis).unwrap_or(0))),
        }
    }

    /// Sets the wall time.
    pub fn set(&self, millis: i64) {
        let previous = self.wall.swap(millis, Ordering::SeqCst);
        if let Ok(forward) = u64::try_from(millis.saturating_sub(previous)) {
            self.monotonic.fetch_add(forward, Ordering::SeqCst);
        }
    }

    /// Moves the wall time by `millis`, which may be negative.
    pub fn advance(&self, millis: i64) {
        let now = self.wall.load(Ordering::SeqCst);
        self.set(now.saturating_add(millis));
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.wall.load(Ordering::SeqCst)
    }

    fn monotonic_millis(&self) -> u64 {
        self.monotonic.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(100);
        let other = clock.clone();

        clock.advance(50);
        assert_eq!(other.now_millis(), 150);
        assert_eq!(other.monotonic_millis(), 150);

        other.set(10);
        assert_eq!(clock.now_millis(), 10);
    }

    #[test]
    fn stepping_wall_back_keeps_monotonic() {
        let clock = ManualClock::new(1_000_000);

        clock.set(990_000);
        assert_eq!(clock.now_millis(), 990_000);
        assert_eq!(clock.monotonic_millis(), 1_000_000);

        clock.advance(50);
        assert_eq!(clock.now_millis(), 990_050);
        assert_eq!(clock.monotonic_millis(), 1_000_050);
    }

    #[test]
    fn negative_start_clamps_monotonic() {
        let clock = ManualClock::new(-5);
        assert_eq!(clock.monotonic_millis(), 0);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock::new().now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn system_clock_monotonic_moves_forward() {
        let clock = SystemClock::new();
        let first = clock.monotonic_millis();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(clock.monotonic_millis() >= first + 5);
    }
}
