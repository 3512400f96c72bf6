//! editorflow - editor keystroke aggregation engine.
//!
//! This crate turns the raw change notifications an editor host emits into
//! per-file keystroke statistics, grouped into fixed-length aggregation
//! windows, and publishes them together with document and window lifecycle
//! events on an in-process bus.
//!
//! # Overview
//!
//! Each text edit is classified by the [`classifier`] into one of six
//! categories and folded into a per-file [`aggregate`]. The [`window`]
//! manager opens a window on the first activity, arms a one-shot flush
//! [`timer`], and at flush time drops idle files, finalizes timestamps and
//! publishes a `kpm` event. Host adapters talk to the engine through the
//! [`tracker`] facade; [`service`] runs it on a tokio task.
//!
//! # Modules
//!
//! - [`types`]: Raw deltas, change categories and bus events
//! - [`classifier`]: Delta classification
//! - [`aggregate`]: Per-file and per-window counters
//! - [`clock`]: System and manual clocks
//! - [`timer`]: One-shot flush deadline
//! - [`window`]: Aggregation window lifecycle and flush
//! - [`bus`]: Typed publish/subscribe
//! - [`tracker`]: Host adapter facade
//! - [`host`]: Host event records and document filtering
//! - [`service`]: Async service loop
//! - [`replay`]: JSON Lines session replay
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types

pub mod aggregate;
pub mod bus;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod host;
pub mod replay;
pub mod service;
pub mod timer;
pub mod tracker;
pub mod types;
pub mod window;

pub use aggregate::{FileAggregate, ProjectAggregate, UNNAMED_PROJECT_PATH};
pub use bus::{EventBus, SubscriberFilter, Subscription};
pub use classifier::{classify, DeltaClassification};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError};
pub use error::{FlowError, Result};
pub use host::{HostEvent, HostRecord};
pub use service::FlowService;
pub use tracker::FlowTracker;
pub use types::{
    ChangeCategory, FlowEvent, FlowEventType, FlushReason, RawEditDelta, StaticMeta, ThemeKind,
};
pub use window::{FlushOutcome, WindowManager, DEFAULT_WINDOW_MS};
