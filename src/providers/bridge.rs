//! D-Bus accessory bridge service provider.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, trace, warn};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use zbus::Connection;

use crate::{
    app_context::AppState,
    config::BusKind,
    event::{Event, EventBus},
    interface::{FridgeInterface, OBJECT_PATH, SERVICE_NAME},
    providers::traits::ServiceProvider,
    status::StatusReport,
    task_manager::TaskManager,
};

/// D-Bus bridge exposing the fridge to external controllers.
///
/// Serves [`FridgeInterface`] and re-emits every status change as a
/// `StatusChanged` signal.
///
/// # Priority and Criticality
///
/// - **Priority**: 8
/// - **Critical**: No (the fridge keeps cycling without a bus)
///
/// # Interface
///
/// - **Service Name**: `io.github.fridged`
/// - **Object Path**: `/io/github/fridged`
///
/// Creation fails when the configured bus is unreachable, which the
/// coordinator treats as "run without a bridge".
pub struct AccessoryBridgeServiceProvider {
    state: Arc<AppState>,
    event_bus: EventBus,
    connection: Connection,
}

impl AccessoryBridgeServiceProvider {
    /// Connects to the bus selected in the configuration.
    pub async fn new(state: Arc<AppState>, event_bus: EventBus) -> Result<Self> {
        let connection = match state.config.bridge.bus {
            BusKind::Session => Connection::session().await,
            BusKind::System => Connection::system().await,
        }
        .with_context(|| format!("Failed to connect to the {:?} bus", state.config.bridge.bus))?;

        Ok(Self {
            state,
            event_bus,
            connection,
        })
    }
}

#[async_trait]
impl ServiceProvider for AccessoryBridgeServiceProvider {
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
        let interface = FridgeInterface::new(
            self.state.fridge.clone(),
            self.event_bus.clone(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        let connection = self.connection.clone();
        connection
            .object_server()
            .at(OBJECT_PATH, interface)
            .await
            .context("Failed to serve fridge interface")?;
        connection
            .request_name(SERVICE_NAME)
            .await
            .with_context(|| format!("Failed to acquire {SERVICE_NAME}"))?;

        // Subscribe before spawning so no update slips past.
        let events = self.event_bus.subscribe();

        task_manager
            .spawn_task(self.name().to_string(), |cancel_token| async move {
                run_bridge(connection, events, cancel_token).await
            })
            .await
    }

    fn name(&self) -> &'static str {
        "AccessoryBridge"
    }

    fn priority(&self) -> i32 {
        8
    }
}

async fn run_bridge(
    connection: Connection,
    mut events: tokio::sync::broadcast::Receiver<Event>,
    cancel_token: CancellationToken,
) -> Result<()> {
    let iface_ref = connection
        .object_server()
        .interface::<_, FridgeInterface>(OBJECT_PATH)
        .await?;
    let mut last: Option<StatusReport> = None;

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("D-Bus bridge cancelled");
                break;
            }
            event = events.recv() => match event {
                Ok(Event::StatusUpdated(report)) => {
                    if last == Some(report) {
                        trace!("Status unchanged, no signal");
                        continue;
                    }
                    last = Some(report);

                    let emitter = iface_ref.signal_emitter();
                    if let Err(e) = FridgeInterface::status_changed(emitter, report).await {
                        warn!("Failed to emit StatusChanged: {e}");
                    }
                    let iface = iface_ref.get().await;
                    if let Err(e) = iface.temperature_changed(emitter).await {
                        debug!("Failed to announce temperature change: {e}");
                    }
                }
                Ok(Event::ShutdownRequested) => {}
                Err(RecvError::Lagged(n)) => warn!("D-Bus bridge lagged by {n} events"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    if let Err(e) = connection.release_name(SERVICE_NAME).await {
        debug!("Failed to release {SERVICE_NAME}: {e}");
    }
    Ok(())
}
