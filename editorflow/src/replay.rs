//! Replay of recorded host sessions.
//!
//! Input is JSON Lines, one [`HostRecord`] per line. Every event published on
//! the bus is written to the output as one JSON line.
//!
//! [`replay`] is deterministic: it drives a [`ManualClock`] from each record's
//! `ts`, so a recording reproduces the same windows every time. A pending
//! flush deadline that falls before the next record's timestamp fires at the
//! deadline itself. [`replay_live`] instead feeds a [`FlowService`] running on
//! the system clock and ignores `ts`.

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bus::{EventBus, SubscriberFilter, Subscription};
use crate::clock::{Clock, ManualClock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::host::HostRecord;
use crate::service::FlowService;
use crate::tracker::FlowTracker;
use crate::types::{FlowEvent, FlowEventType, FlushReason};

/// Options shared by both replay modes.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    pub config: Config,

    /// Only write `kpm` events.
    pub kpm_only: bool,
}

/// Counters reported at the end of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Records parsed and handed to the tracker.
    pub records: usize,
    /// Lines skipped because they were not valid records.
    pub skipped: usize,
    /// Bus events written to the output.
    pub events_written: usize,
}

fn output_filter(options: &ReplayOptions) -> SubscriberFilter {
    if options.kpm_only {
        SubscriberFilter::new().with_event_type(FlowEventType::Kpm)
    } else {
        SubscriberFilter::new()
    }
}

fn parse_line(line_no: usize, line: &str) -> Option<HostRecord> {
    match serde_json::from_str::<HostRecord>(line) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(line = line_no, error = %e, "Skipping malformed replay line");
            None
        }
    }
}

fn write_event<W: Write>(output: &mut W, event: &FlowEvent) -> Result<()> {
    serde_json::to_writer(&mut *output, event)?;
    writeln!(output)?;
    Ok(())
}

/// Replays `input` on simulated time, writing bus events to `output`.
///
/// # Errors
///
/// Returns an error if reading the input or writing the output fails.
/// Malformed lines are logged and skipped.
pub fn replay<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    options: &ReplayOptions,
) -> Result<ReplaySummary> {
    let bus = EventBus::new();
    let buffer: Arc<Mutex<Vec<FlowEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buffer);
    let _subscription = bus.subscribe_filtered(output_filter(options), move |event| {
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    });

    let clock = ManualClock::new(0);
    let mut tracker: Option<FlowTracker> = None;
    let mut summary = ReplaySummary::default();

    let drain = |output: &mut W, summary: &mut ReplaySummary| -> Result<()> {
        let events: Vec<FlowEvent> = std::mem::take(
            &mut *buffer.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for event in &events {
            write_event(output, event)?;
            summary.events_written += 1;
        }
        Ok(())
    };

    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(record) = parse_line(idx + 1, line) else {
            summary.skipped += 1;
            continue;
        };

        let tracker = tracker.get_or_insert_with(|| {
            // the first record fixes the epoch the window manager starts from
            if let Some(ts) = record.ts {
                clock.set(ts);
            }
            FlowTracker::new(&options.config, bus.clone(), Arc::new(clock.clone()))
        });

        if let Some(ts) = record.ts {
            advance_to(tracker, &clock, ts);
        }
        record.event.dispatch(tracker, &options.config.workspace_folders);
        summary.records += 1;
        drain(&mut output, &mut summary)?;
    }

    if let Some(tracker) = tracker.as_mut() {
        debug!(now = tracker.now_millis(), "Replay input exhausted");
        tracker.flush(FlushReason::Shutdown);
    }
    drain(&mut output, &mut summary)?;
    output.flush()?;

    info!(
        records = summary.records,
        skipped = summary.skipped,
        events = summary.events_written,
        "Replay finished"
    );
    Ok(summary)
}

/// Moves simulated time forward to `ts`, firing a deadline passed on the way.
fn advance_to(tracker: &mut FlowTracker, clock: &ManualClock, ts: i64) {
    let now = clock.now_millis();
    if ts < now {
        warn!(ts, now, "Replay timestamp went backwards, holding time");
    }
    let step = ts.saturating_sub(now).max(0);

    if let Some(remaining) = tracker.time_until_flush() {
        let remaining = i64::try_from(remaining.as_millis()).unwrap_or(i64::MAX);
        if remaining <= step {
            clock.advance(remaining);
            tracker.poll_timer();
            clock.advance(step - remaining);
            return;
        }
    }
    clock.advance(step);
}

/// Replays `input` through a live [`FlowService`] on the system clock.
///
/// Timer flushes are written as they happen, not only when the next line
/// arrives.
///
/// # Errors
///
/// Returns an error if reading the input, writing the output, or stopping
/// the service fails.
pub async fn replay_live<R, W>(
    input: R,
    mut output: W,
    options: &ReplayOptions,
) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let bus = EventBus::new();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let subscription: Subscription = bus.subscribe_filtered(output_filter(options), move |event| {
        let _ = events_tx.send(event.clone());
    });

    let service = FlowService::spawn(&options.config, bus, Arc::new(SystemClock::new()));
    let mut summary = ReplaySummary::default();
    let mut lines = input.lines();
    let mut line_no = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                line_no += 1;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match parse_line(line_no, line) {
                    Some(record) => {
                        service.send(record.event).await?;
                        summary.records += 1;
                    }
                    None => summary.skipped += 1,
                }
            }

            Some(event) = events_rx.recv() => {
                write_event(&mut output, &event)?;
                summary.events_written += 1;
            }
        }
    }

    service.shutdown().await?;
    drop(subscription);
    while let Some(event) = events_rx.recv().await {
        write_event(&mut output, &event)?;
        summary.events_written += 1;
    }
    output.flush()?;

    info!(
        records = summary.records,
        skipped = summary.skipped,
        events = summary.events_written,
        "Live replay finished"
    );
    Ok(summary)
}
