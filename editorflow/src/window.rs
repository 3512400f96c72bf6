//! Aggregation window manager.
//!
//! The [`WindowManager`] owns the aggregate of the window that is currently
//! open, the single flush timer guarding it, and the flush protocol that
//! finalizes the window and publishes it on the bus.
//!
//! # Window lifecycle
//!
//! ```text
//!            touch / record_change                  flush
//!   CLOSED ─────────────────────────▶ OPEN ─────────────────────▶ CLOSED
//!            (aggregate created,            (timer cancelled,
//!             timer armed)                   kpm published if any
//!                                            file has keystrokes)
//! ```
//!
//! At most one window is open at a time. Touching an open window never
//! re-arms its timer, so a window lasts at most one window duration after its
//! first touch, no matter how many edits arrive.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use editorflow::bus::EventBus;
//! use editorflow::clock::ManualClock;
//! use editorflow::types::RawEditDelta;
//! use editorflow::window::WindowManager;
//!
//! let clock = ManualClock::new(0);
//! let bus = EventBus::new();
//! let mut manager = WindowManager::new(
//!     Duration::from_secs(60),
//!     bus.clone(),
//!     Arc::new(clock.clone()),
//! );
//!
//! manager.record_change("main.go", "/ws", &[RawEditDelta::insert(0, "a")]);
//! assert!(manager.is_open());
//!
//! clock.set(60_000);
//! assert!(manager.fire_if_due());
//! assert!(!manager.is_open());
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::aggregate::{FileAggregate, ProjectAggregate};
use crate::bus::EventBus;
use crate::classifier::classify;
use crate::clock::Clock;
use crate::timer::{duration_millis, FlushTimer};
use crate::types::{FlowEvent, FlushReason, RawEditDelta, StaticMeta};

/// Default aggregation window length in milliseconds.
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Minimum gap after the previous flush used when a file has no start time.
const FALLBACK_START_GAP_MS: i64 = 500;

/// What a call to [`WindowManager::flush`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// No window was open.
    Idle,
    /// A window was closed but no file had keystrokes, so nothing was sent.
    Discarded,
    /// A window was closed and published as `kpm` with this many files.
    Published { files: usize },
}

/// Owns the open aggregation window and its flush timer.
#[derive(Debug)]
pub struct WindowManager {
    window_duration: Duration,
    current: Option<ProjectAggregate>,
    timer: FlushTimer,
    last_flush: i64,
    bus: EventBus,
    clock: Arc<dyn Clock>,
}

impl WindowManager {
    /// Creates a manager with no open window.
    #[must_use]
    pub fn new(window_duration: Duration, bus: EventBus, clock: Arc<dyn Clock>) -> Self {
        let last_flush = clock.now_millis();
        Self {
            window_duration,
            current: None,
            timer: FlushTimer::new(),
            last_flush,
            bus,
            clock,
        }
    }

    /// Ensures a window and an entry for `file_name` exist, arming the flush
    /// timer if it is not armed yet.
    pub fn touch_file(&mut self, file_name: &str, file_path: &str) -> &mut FileAggregate {
        let now = self.clock.now_millis();

        if self.timer.arm(self.clock.monotonic_millis(), self.window_duration) {
            debug!(
                window_ms = self.window_duration.as_millis(),
                deadline = ?self.timer.deadline(),
                "Flush timer armed"
            );
        }

        let project = self.current.get_or_insert_with(|| {
            debug!(file_name, "Opened aggregation window");
            ProjectAggregate::new()
        });
        project.file_entry(file_name, file_path, now)
    }

    /// Classifies `deltas` and accumulates them onto the aggregate for
    /// `file_name`.
    pub fn record_change(&mut self, file_name: &str, file_path: &str, deltas: &[RawEditDelta]) {
        let file = self.touch_file(file_name, file_path);
        for delta in deltas {
            file.apply(&classify(delta));
        }
        trace!(
            file_name,
            deltas = deltas.len(),
            keystrokes = file.keystrokes,
            "Recorded change"
        );
    }

    /// Records syntax and character count for a file in the open window.
    ///
    /// Values already set are kept. Does nothing if the file is not part of
    /// the open window.
    pub fn record_static_metadata(&mut self, file_name: &str, meta: &StaticMeta) {
        if let Some(file) = self
            .current
            .as_mut()
            .and_then(|project| project.get_mut(file_name))
        {
            file.set_static_meta(meta);
        }
    }

    /// Stamps `end = now` on every other file of the open window whose end
    /// is still unset.
    pub fn end_previous_files(&mut self, except_file_name: &str) {
        let Some(project) = self.current.as_mut() else {
            return;
        };
        let now = self.clock.now_millis();
        for (name, file) in &mut project.docs_changed {
            if name != except_file_name && file.end.is_none() {
                file.end = Some(now);
                trace!(file_name = %name, end = now, "Ended file");
            }
        }
    }

    /// Finalizes the open window and publishes it as `kpm`.
    ///
    /// Files without keystrokes are dropped, missing start and end times are
    /// filled in, and the event is only published if at least one file
    /// remains. Calling this with no open window does nothing beyond
    /// recording the flush time.
    pub fn flush(&mut self, reason: FlushReason) -> FlushOutcome {
        let now = self.clock.now_millis();
        self.timer.cancel();

        let Some(mut project) = self.current.take() else {
            self.last_flush = now;
            trace!(?reason, "Flush with no open window");
            return FlushOutcome::Idle;
        };

        let fallback_start = (self.last_flush + FALLBACK_START_GAP_MS)
            .max(now - duration_millis(self.window_duration));

        project.docs_changed.retain(|_, file| !file.is_idle());
        for file in project.docs_changed.values_mut() {
            let start = *file.start.get_or_insert(fallback_start);
            if file.end.map_or(true, |end| end <= start) {
                file.end = Some(now);
            }
        }

        let outcome = if project.is_empty() {
            debug!(?reason, "Discarded window without keystrokes");
            FlushOutcome::Discarded
        } else {
            let files = project.len();
            info!(
                ?reason,
                files,
                keystrokes = project.total_keystrokes(),
                "Publishing keystroke aggregate"
            );
            self.bus.publish(&FlowEvent::Kpm { reason, project });
            FlushOutcome::Published { files }
        };

        self.last_flush = now;
        outcome
    }

    /// Flushes with [`FlushReason::Timer`] if the timer deadline has passed.
    ///
    /// Returns `true` if a flush ran.
    pub fn fire_if_due(&mut self) -> bool {
        if !self.timer.is_due(self.clock.monotonic_millis()) {
            return false;
        }
        self.flush(FlushReason::Timer);
        true
    }

    /// Copy of the open aggregate, for lifecycle pass-through events.
    #[must_use]
    pub fn snapshot(&self) -> Option<ProjectAggregate> {
        self.current.clone()
    }

    #[must_use]
    pub fn current(&self) -> Option<&ProjectAggregate> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Pending flush deadline on the clock's monotonic scale.
    #[must_use]
    pub fn deadline(&self) -> Option<u64> {
        self.timer.deadline()
    }

    /// Time left until the pending flush, if a window is open.
    #[must_use]
    pub fn time_until_flush(&self) -> Option<Duration> {
        self.timer.remaining(self.clock.monotonic_millis())
    }

    #[must_use]
    pub fn timer(&self) -> &FlushTimer {
        &self.timer
    }

    #[must_use]
    pub fn last_flush(&self) -> i64 {
        self.last_flush
    }

    #[must_use]
    pub fn window_duration(&self) -> Duration {
        self.window_duration
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }
}
