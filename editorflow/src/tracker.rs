//! Host adapter facade.
//!
//! [`FlowTracker`] is the surface an editor host adapter calls into. It turns
//! document and window notifications into window manager operations and
//! lifecycle events on the bus. The adapter is expected to have filtered out
//! non-document pseudo-files already (see [`crate::host::is_document_event`]).
//!
//! Document notifications (open, close, change) that arrive while the editor
//! window is known to be unfocused are ignored; saves are always recorded.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::aggregate::ProjectAggregate;
use crate::bus::EventBus;
use crate::clock::Clock;
use crate::config::Config;
use crate::types::{FileRef, FlowEvent, FlushReason, RawEditDelta, StaticMeta, ThemeKind};
use crate::window::{FlushOutcome, WindowManager};

/// Adapter-facing entry point wiring the window manager to the event bus.
#[derive(Debug)]
pub struct FlowTracker {
    manager: WindowManager,
    bus: EventBus,
    focused: bool,
    primary_window: bool,
}

impl FlowTracker {
    /// Creates a tracker with a fresh window manager publishing on `bus`.
    #[must_use]
    pub fn new(config: &Config, bus: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            manager: WindowManager::new(config.window_duration, bus.clone(), clock),
            bus,
            focused: true,
            primary_window: false,
        }
    }

    /// A document was opened.
    pub fn on_open(&mut self, file_name: &str, file_path: &str, meta: &StaticMeta) {
        if !self.focused {
            trace!(file_name, "Ignoring open while unfocused");
            return;
        }

        self.manager.end_previous_files(file_name);
        self.manager.touch_file(file_name, file_path);
        self.publish(FlowEvent::Open {
            file: FileRef::new(file_name, file_path),
            project: self.manager.snapshot(),
        });
        self.manager.record_static_metadata(file_name, meta);
    }

    /// A document was closed.
    pub fn on_close(&mut self, file_name: &str, file_path: &str) {
        if !self.focused {
            trace!(file_name, "Ignoring close while unfocused");
            return;
        }

        self.manager.touch_file(file_name, file_path);
        self.publish(FlowEvent::Close {
            file: FileRef::new(file_name, file_path),
            project: self.manager.snapshot(),
        });
    }

    /// A document changed. `deltas` are the edits of one host notification.
    pub fn on_change(
        &mut self,
        file_name: &str,
        file_path: &str,
        deltas: &[RawEditDelta],
        meta: &StaticMeta,
    ) {
        if !self.focused {
            trace!(file_name, "Ignoring change while unfocused");
            return;
        }

        self.manager.touch_file(file_name, file_path);
        self.manager.record_static_metadata(file_name, meta);
        self.manager.record_change(file_name, file_path, deltas);
        self.publish(FlowEvent::Change {
            file: FileRef::new(file_name, file_path),
            delta_count: deltas.len(),
            project: self.manager.snapshot(),
        });
    }

    /// A document was saved.
    pub fn on_save(&mut self, file_name: &str, file_path: &str) {
        self.manager.touch_file(file_name, file_path);
        self.publish(FlowEvent::Save {
            file: FileRef::new(file_name, file_path),
            project: self.manager.snapshot(),
        });
    }

    /// The editor window's focus state changed.
    ///
    /// Losing focus while the window stays active flushes the open window
    /// early. Losing focus while inactive only records the focus state.
    pub fn on_focus_changed(&mut self, focused: bool, active: bool) {
        self.focused = focused;

        if focused {
            debug!(primary = self.primary_window, "Editor window focused");
            self.publish(FlowEvent::Focus {
                primary: self.primary_window,
                project: self.manager.snapshot(),
            });
        } else if active {
            debug!(primary = self.primary_window, "Editor window unfocused");
            self.publish(FlowEvent::Unfocus {
                primary: self.primary_window,
                project: self.manager.snapshot(),
            });
            self.manager.flush(FlushReason::Unfocus);
        }
    }

    /// The color theme changed.
    pub fn on_theme_changed(&mut self, kind: ThemeKind) {
        self.publish(FlowEvent::Theme {
            kind,
            project: self.manager.snapshot(),
        });
    }

    /// Marks this editor instance as the primary window of its workspace.
    pub fn set_primary_window(&mut self, primary: bool) {
        self.primary_window = primary;
    }

    /// Flushes the open window if its timer has expired.
    pub fn poll_timer(&mut self) -> bool {
        self.manager.fire_if_due()
    }

    /// Flushes the open window immediately.
    pub fn flush(&mut self, reason: FlushReason) -> FlushOutcome {
        self.manager.flush(reason)
    }

    /// Pending flush deadline on the clock's monotonic scale.
    #[must_use]
    pub fn deadline(&self) -> Option<u64> {
        self.manager.deadline()
    }

    /// Time left until the pending flush, if a window is open.
    #[must_use]
    pub fn time_until_flush(&self) -> Option<Duration> {
        self.manager.time_until_flush()
    }

    #[must_use]
    pub fn current(&self) -> Option<&ProjectAggregate> {
        self.manager.current()
    }

    #[must_use]
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    #[must_use]
    pub fn is_primary_window(&self) -> bool {
        self.primary_window
    }

    #[must_use]
    pub fn manager(&self) -> &WindowManager {
        &self.manager
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn now_millis(&self) -> i64 {
        self.manager.now_millis()
    }

    fn publish(&self, event: FlowEvent) {
        self.bus.publish(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::bus::Subscription;
    use crate::clock::ManualClock;
    use crate::types::FlowEventType;

    struct Harness {
        clock: ManualClock,
        tracker: FlowTracker,
        events: Arc<Mutex<Vec<FlowEvent>>>,
        _subscription: Subscription,
    }

    impl Harness {
        fn types(&self) -> Vec<FlowEventType> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(FlowEvent::event_type)
                .collect()
        }

        fn kpm_count(&self) -> usize {
            self.types()
                .into_iter()
                .filter(|t| *t == FlowEventType::Kpm)
                .count()
        }
    }

    fn harness() -> Harness {
        let clock = ManualClock::new(0);
        let bus = EventBus::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let subscription = bus.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        let config = Config::default().with_window_duration(Duration::from_secs(60));
        let tracker = FlowTracker::new(&config, bus, Arc::new(clock.clone()));
        Harness {
            clock,
            tracker,
            events,
            _subscription: subscription,
        }
    }

    fn typed(text: &str) -> Vec<RawEditDelta> {
        vec![RawEditDelta::insert(0, text)]
    }

    #[test]
    fn open_publishes_with_current_window() {
        let mut h = harness();
        h.tracker.on_open("/ws/a.rs", "/ws", &StaticMeta::new("rust", 10));

        let events = h.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            FlowEvent::Open { file, project } => {
                assert_eq!(file.file_name, "/ws/a.rs");
                let project = project.as_ref().expect("open carries the window");
                assert!(project.get("/ws/a.rs").is_some());
            }
            other => panic!("unexpected event {other:?}"),
        }
        drop(events);

        let file = h.tracker.current().unwrap().get("/ws/a.rs").unwrap();
        assert_eq!(file.syntax.as_deref(), Some("rust"));
        assert_eq!(file.character_count, Some(10));
    }

    #[test]
    fn open_ends_previously_edited_files() {
        let mut h = harness();
        h.tracker.on_change("a.rs", "/ws", &typed("x"), &StaticMeta::default());
        h.clock.set(4_000);
        h.tracker.on_open("b.rs", "/ws", &StaticMeta::default());

        let project = h.tracker.current().unwrap();
        assert_eq!(project.get("a.rs").unwrap().end, Some(4_000));
        assert_eq!(project.get("b.rs").unwrap().end, None);
    }

    #[test]
    fn change_records_and_publishes() {
        let mut h = harness();
        h.tracker.on_change(
            "a.rs",
            "/ws",
            &[RawEditDelta::insert(0, "a"), RawEditDelta::insert(0, "b")],
            &StaticMeta::new("rust", 2),
        );

        let events = h.events.lock().unwrap();
        match &events[0] {
            FlowEvent::Change {
                delta_count,
                project,
                ..
            } => {
                assert_eq!(*delta_count, 2);
                let file = project.as_ref().unwrap().get("a.rs").unwrap();
                assert_eq!(file.keystrokes, 2);
                assert_eq!(file.syntax.as_deref(), Some("rust"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn close_and_save_touch_window() {
        let mut h = harness();
        h.tracker.on_close("a.rs", "/ws");
        h.tracker.on_save("b.rs", "/ws");

        assert_eq!(h.types(), vec![FlowEventType::Close, FlowEventType::Save]);
        let project = h.tracker.current().unwrap();
        assert!(project.get("a.rs").is_some());
        assert!(project.get("b.rs").is_some());
        assert!(h.tracker.deadline().is_some());
    }

    #[test]
    fn unfocus_while_active_flushes_after_publishing() {
        let mut h = harness();
        h.tracker.set_primary_window(true);
        h.tracker.on_change("a.rs", "/ws", &typed("x"), &StaticMeta::default());

        h.clock.set(5_000);
        h.tracker.on_focus_changed(false, true);

        assert_eq!(
            h.types(),
            vec![
                FlowEventType::Change,
                FlowEventType::Unfocus,
                FlowEventType::Kpm
            ]
        );
        let events = h.events.lock().unwrap();
        match &events[1] {
            FlowEvent::Unfocus { primary, project } => {
                assert!(*primary);
                assert!(project.is_some());
            }
            other => panic!("unexpected event {other:?}"),
        }
        match &events[2] {
            FlowEvent::Kpm { reason, project } => {
                assert_eq!(*reason, FlushReason::Unfocus);
                assert_eq!(project.get("a.rs").unwrap().end, Some(5_000));
            }
            other => panic!("unexpected event {other:?}"),
        }
        drop(events);
        assert!(h.tracker.current().is_none());
        assert!(h.tracker.deadline().is_none());
    }

    #[test]
    fn unfocus_while_inactive_publishes_nothing() {
        let mut h = harness();
        h.tracker.on_change("a.rs", "/ws", &typed("x"), &StaticMeta::default());
        h.tracker.on_focus_changed(false, false);

        assert_eq!(h.types(), vec![FlowEventType::Change]);
        assert!(h.tracker.current().is_some());
        assert!(!h.tracker.is_focused());
    }

    #[test]
    fn document_events_ignored_while_unfocused() {
        let mut h = harness();
        h.tracker.on_focus_changed(false, false);

        h.tracker.on_open("a.rs", "/ws", &StaticMeta::default());
        h.tracker.on_change("a.rs", "/ws", &typed("x"), &StaticMeta::default());
        h.tracker.on_close("a.rs", "/ws");
        assert!(h.types().is_empty());
        assert!(h.tracker.current().is_none());

        // saves still count
        h.tracker.on_save("a.rs", "/ws");
        assert_eq!(h.types(), vec![FlowEventType::Save]);

        h.tracker.on_focus_changed(true, true);
        h.tracker.on_change("a.rs", "/ws", &typed("x"), &StaticMeta::default());
        assert_eq!(
            h.tracker.current().unwrap().get("a.rs").unwrap().keystrokes,
            1
        );
    }

    #[test]
    fn focus_publishes_without_flushing() {
        let mut h = harness();
        h.tracker.on_change("a.rs", "/ws", &typed("x"), &StaticMeta::default());
        h.tracker.on_focus_changed(true, true);

        assert_eq!(h.types(), vec![FlowEventType::Change, FlowEventType::Focus]);
        assert!(h.tracker.current().is_some());
    }

    #[test]
    fn theme_change_is_passed_through() {
        let mut h = harness();
        h.tracker.on_theme_changed(ThemeKind::HighContrast);

        let events = h.events.lock().unwrap();
        assert!(matches!(
            events[0],
            FlowEvent::Theme {
                kind: ThemeKind::HighContrast,
                project: None
            }
        ));
    }

    #[test]
    fn poll_timer_flushes_at_deadline() {
        let mut h = harness();
        h.tracker.on_change("main.go", "/ws", &typed("a"), &StaticMeta::default());

        h.clock.set(30_000);
        assert!(!h.tracker.poll_timer());
        h.clock.set(60_000);
        assert!(h.tracker.poll_timer());
        assert_eq!(h.kpm_count(), 1);

        // a second poll has nothing left to flush
        assert!(!h.tracker.poll_timer());
        assert_eq!(h.kpm_count(), 1);
    }

    #[test]
    fn unfocus_then_timer_emits_once() {
        let mut h = harness();
        h.tracker.on_change("a.rs", "/ws", &typed("a"), &StaticMeta::default());
        h.tracker.on_focus_changed(false, true);
        h.clock.set(60_000);
        h.tracker.poll_timer();

        assert_eq!(h.kpm_count(), 1);
    }
}
