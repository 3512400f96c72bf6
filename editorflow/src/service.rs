//! Async flow service.
//!
//! [`FlowService`] owns a [`FlowTracker`] on a tokio task and feeds it
//! [`HostEvent`]s from a bounded channel. The task sleeps until the pending
//! flush deadline while waiting for input, so the window is flushed on time
//! even when the host goes quiet. When every sender is dropped the open
//! window is flushed with [`FlushReason::Shutdown`] and the task exits.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::bus::EventBus;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{FlowError, Result};
use crate::host::HostEvent;
use crate::tracker::FlowTracker;
use crate::types::FlushReason;

/// Handle to a running flow service task.
#[derive(Debug)]
pub struct FlowService {
    tx: mpsc::Sender<HostEvent>,
    task: JoinHandle<()>,
}

impl FlowService {
    /// Spawns the service on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(config: &Config, bus: EventBus, clock: Arc<dyn Clock>) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let tracker = FlowTracker::new(config, bus, clock);
        let task = tokio::spawn(run_flow_loop(
            tracker,
            rx,
            config.workspace_folders.clone(),
        ));

        Self { tx, task }
    }

    /// A sender for additional producers.
    ///
    /// Outstanding senders keep the service alive past [`FlowService::shutdown`].
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<HostEvent> {
        self.tx.clone()
    }

    /// Sends an event, waiting for channel capacity.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::ChannelClosed`] if the service has stopped.
    pub async fn send(&self, event: HostEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| FlowError::ChannelClosed)
    }

    /// Sends an event without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::ChannelFull`] when the channel is at capacity and
    /// [`FlowError::ChannelClosed`] if the service has stopped.
    pub fn try_send(&self, event: HostEvent) -> Result<()> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => FlowError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => FlowError::ChannelClosed,
        })
    }

    /// Closes the input channel and waits for the final flush.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Task`] if the service task panicked.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.tx);
        self.task.await?;
        Ok(())
    }
}

async fn run_flow_loop(
    mut tracker: FlowTracker,
    mut input_rx: mpsc::Receiver<HostEvent>,
    workspace_folders: Vec<String>,
) {
    info!(
        window_ms = tracker.manager().window_duration().as_millis(),
        "Flow service started"
    );

    loop {
        let wait = tracker.time_until_flush();

        tokio::select! {
            event = input_rx.recv() => {
                match event {
                    Some(event) => {
                        trace!(event = ?event, "Received host event");
                        event.dispatch(&mut tracker, &workspace_folders);
                    }
                    None => {
                        debug!("Input channel closed, flushing open window");
                        tracker.flush(FlushReason::Shutdown);
                        break;
                    }
                }
            }

            () = async {
                match wait {
                    Some(wait) => tokio::time::sleep(wait).await,
                    None => std::future::pending::<()>().await,
                }
            } => {
                tracker.poll_timer();
            }
        }
    }

    info!("Flow service stopped");
}
