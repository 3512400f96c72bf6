//! In-process event bus.
//!
//! The bus decouples the window manager from its consumers. Publishing is
//! synchronous fan-out: every matching handler runs on the publisher's thread
//! before [`EventBus::publish`] returns. There is no queue, no persistence and
//! no backpressure.
//!
//! # Architecture
//!
//! - [`EventBus`] - a cheaply clonable handle to a shared handler registry
//! - [`Subscription`] - removes its handler when dropped or unsubscribed
//! - [`SubscriberFilter`] - optional criteria so a handler only sees the
//!   events it cares about
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use editorflow::bus::{EventBus, SubscriberFilter};
//! use editorflow::types::{FlowEvent, FlowEventType, ThemeKind};
//!
//! let bus = EventBus::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! let subscription = bus.subscribe_filtered(
//!     SubscriberFilter::new().with_event_type(FlowEventType::Theme),
//!     move |event| sink.lock().unwrap().push(event.event_type()),
//! );
//!
//! bus.publish(&FlowEvent::Theme { kind: ThemeKind::Dark, project: None });
//! assert_eq!(seen.lock().unwrap().as_slice(), &[FlowEventType::Theme]);
//!
//! subscription.unsubscribe();
//! assert_eq!(bus.subscriber_count(), 0);
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::{debug, trace, warn};

use crate::types::{FlowEvent, FlowEventType};

type Handler = Arc<dyn Fn(&FlowEvent) + Send + Sync>;

struct Entry {
    id: u64,
    filter: SubscriberFilter,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Handle to a shared publish/subscribe registry.
///
/// Clones share the same registry, so a handle can be given to the window
/// manager while consumers subscribe through another.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<RwLock<Registry>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for every event.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// dropped or [`Subscription::unsubscribe`] is called.
    #[must_use = "dropping the subscription unsubscribes the handler"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&FlowEvent) + Send + Sync + 'static,
    {
        self.subscribe_filtered(SubscriberFilter::new(), handler)
    }

    /// Registers a handler for events matching `filter`.
    #[must_use = "dropping the subscription unsubscribes the handler"]
    pub fn subscribe_filtered<F>(&self, filter: SubscriberFilter, handler: F) -> Subscription
    where
        F: Fn(&FlowEvent) + Send + Sync + 'static,
    {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push(Entry {
            id,
            filter,
            handler: Arc::new(handler),
        });
        debug!(
            subscription_id = id,
            subscriber_count = registry.entries.len(),
            "New subscriber added"
        );

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Delivers `event` to every matching handler, in subscription order.
    ///
    /// Returns the number of handlers that received the event. Publishing
    /// with no subscribers is a no-op that returns 0. A handler that panics
    /// is logged and skipped; the remaining handlers still run.
    pub fn publish(&self, event: &FlowEvent) -> usize {
        // handlers run outside the lock so they may subscribe or publish
        let handlers: Vec<(u64, Handler)> = {
            let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
            registry
                .entries
                .iter()
                .filter(|entry| entry.filter.matches(event))
                .map(|entry| (entry.id, Arc::clone(&entry.handler)))
                .collect()
        };

        trace!(
            event_type = ?event.event_type(),
            receivers = handlers.len(),
            "Publishing event"
        );

        let mut delivered = 0;
        for (id, handler) in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => delivered += 1,
                Err(_) => warn!(
                    subscription_id = id,
                    event_type = ?event.event_type(),
                    "Subscriber panicked while handling event"
                ),
            }
        }
        delivered
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}

/// Keeps a handler registered on an [`EventBus`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<RwLock<Registry>>,
}

impl Subscription {
    /// Removes the handler from the bus.
    pub fn unsubscribe(self) {
        drop(self);
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.write().unwrap_or_else(PoisonError::into_inner);
        registry.entries.retain(|entry| entry.id != self.id);
        debug!(
            subscription_id = self.id,
            subscriber_count = registry.entries.len(),
            "Subscriber removed"
        );
    }
}

/// Filter criteria for selecting which events a handler receives.
///
/// All specified criteria use AND logic. Unset criteria always match.
///
/// # Example
///
/// ```rust
/// use editorflow::bus::SubscriberFilter;
/// use editorflow::types::FlowEventType;
///
/// // only saves of one file
/// let filter = SubscriberFilter::new()
///     .with_event_type(FlowEventType::Save)
///     .with_file_name("/ws/src/main.rs");
///
/// // everything
/// let filter = SubscriberFilter::new();
/// assert!(filter.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberFilter {
    /// Filter by event kind.
    pub event_type: Option<FlowEventType>,

    /// Filter by file name. Events that carry no file never match.
    pub file_name: Option<String>,
}

impl SubscriberFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_event_type(mut self, event_type: FlowEventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Checks if an event matches every criterion of this filter.
    #[must_use]
    pub fn matches(&self, event: &FlowEvent) -> bool {
        if let Some(event_type) = self.event_type {
            if event.event_type() != event_type {
                return false;
            }
        }

        if let Some(ref file_name) = self.file_name {
            match event.file_name() {
                Some(name) if name == file_name => {}
                _ => return false,
            }
        }

        true
    }

    /// Returns `true` if no criteria are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.event_type.is_none() && self.file_name.is_none()
    }
}
