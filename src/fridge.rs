//! Shared fridge state, the state monitor and the setting mutators.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use log::{info, trace, warn};
use tokio::sync::{RwLock, mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::{
    command::{CommandSender, command_channel},
    drivers::LinkPorts,
    event::{Event, EventBus},
    status::{Settings, StatusReport},
};

/// Handle to the last known fridge state.
///
/// Readers share the lock; the only writer is [`Fridge::monitor`]. Setting
/// changes never touch the stored report directly, they are sent to the
/// device link and come back through the status stream.
#[derive(Debug, Clone)]
pub struct Fridge {
    status: Arc<RwLock<StatusReport>>,
    data_ready: Arc<watch::Sender<bool>>,
    commands: CommandSender,
}

/// Everything produced when wiring a fridge to its device link.
#[derive(Debug)]
pub struct FridgeParts {
    pub fridge: Fridge,
    /// Inbound status stream, to be drained by [`Fridge::monitor`].
    pub inlet: ReceiverStream<StatusReport>,
    /// Device-link side of the status stream and command channel.
    pub ports: LinkPorts,
}

impl Fridge {
    /// Creates a fridge with empty state together with its channels.
    pub fn build() -> FridgeParts {
        let (status_tx, status_rx) = mpsc::channel(1);
        let (command_tx, command_rx) = command_channel();
        let (data_ready, _) = watch::channel(false);

        FridgeParts {
            fridge: Self {
                status: Arc::new(RwLock::new(StatusReport::default())),
                data_ready: Arc::new(data_ready),
                commands: command_tx,
            },
            inlet: ReceiverStream::new(status_rx),
            ports: LinkPorts {
                status_tx,
                commands: command_rx,
            },
        }
    }

    /// Returns the most recently installed status report.
    pub async fn status_report(&self) -> StatusReport {
        let report = *self.status.read().await;
        trace!("Getting status report: {:.1}°C", report.temperature);
        report
    }

    pub async fn settings(&self) -> Settings {
        self.status_report().await.settings
    }

    pub(crate) async fn install(&self, report: StatusReport) {
        *self.status.write().await = report;

        if !report.settings.is_initial() {
            self.data_ready.send_if_modified(|ready| !std::mem::replace(ready, true));
        }
    }

    /// Returns true once a report with real settings has been installed.
    pub fn has_data(&self) -> bool {
        *self.data_ready.borrow()
    }

    /// Waits for the first report carrying real settings.
    ///
    /// Returns `false` if `cancel_token` fires first. Data that is already
    /// present wins over a cancelled token.
    pub async fn wait_for_data(&self, cancel_token: &CancellationToken) -> bool {
        let mut ready = self.data_ready.subscribe();

        tokio::select! {
            biased;
            result = ready.wait_for(|ready| *ready) => result.is_ok(),
            () = cancel_token.cancelled() => false,
        }
    }

    /// Installs every report from `reports` until the stream ends.
    ///
    /// Each install is published as [`Event::StatusUpdated`].
    pub async fn monitor<S>(&self, mut reports: S, event_bus: &EventBus)
    where
        S: Stream<Item = StatusReport> + Unpin,
    {
        let mut count = 0u64;

        while let Some(report) = reports.next().await {
            trace!("Fridge got status update: {:.1}°C", report.temperature);
            self.install(report).await;
            count += 1;

            if event_bus.has_subscribers() {
                if let Err(e) = event_bus.publish(Event::StatusUpdated(report)) {
                    trace!("No listener for status update: {e}");
                }
            }
        }

        info!("Status stream closed after {count} reports");
    }

    /// Sends a command to switch the fridge on or off.
    pub async fn set_on(&self, on: bool) {
        info!("SetOn: {on}");
        let settings = self.settings().await.with_on(on);
        self.send(settings).await;
    }

    /// Sends a command to toggle eco mode.
    pub async fn set_eco_mode(&self, eco_mode: bool) {
        info!("SetEcoMode: {eco_mode}");
        let settings = self.settings().await.with_eco_mode(eco_mode);
        self.send(settings).await;
    }

    /// Sends a command to toggle the panel lock.
    pub async fn set_locked(&self, locked: bool) {
        info!("SetLocked: {locked}");
        let settings = self.settings().await.with_locked(locked);
        self.send(settings).await;
    }

    /// Enqueues `settings` on the command channel, logging failures.
    pub(crate) async fn send(&self, settings: Settings) -> bool {
        match self.commands.send(settings).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send settings {settings:?}: {e}");
                false
            }
        }
    }
}
