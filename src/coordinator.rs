//! System coordinator for managing service lifecycle and dependency injection.

use std::{future::pending, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::sync::broadcast::error::RecvError;

use crate::{
    app_context::AppState,
    config::Config,
    event::{Event, EventBus},
    providers::{
        AccessoryBridgeServiceProvider, AppStateProvider, AsyncProvider,
        CycleSchedulerServiceProvider, DeviceLinkServiceProvider, ServiceProvider,
        StateMonitorServiceProvider,
    },
    signals::spawn_signal_listener,
    task_manager::TaskManager,
};

/// Supervises every service of the daemon.
///
/// Owns the root cancellation token (through the [`TaskManager`]) and the
/// event bus. The main loop ends when the root is cancelled, the overall
/// timeout elapses or a stop is requested; shutdown then waits for every
/// service under the configured deadline.
pub struct SystemCoordinator {
    task_manager: TaskManager,
    event_bus: EventBus,
    service_providers: Vec<Box<dyn ServiceProvider>>,
    timeout: Option<Duration>,
}

impl Default for SystemCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCoordinator {
    pub fn new() -> Self {
        Self {
            task_manager: TaskManager::new(),
            event_bus: EventBus::new(),
            service_providers: Vec::new(),
            timeout: None,
        }
    }

    /// Builds the shared state from `config` and registers every service.
    pub async fn initialize(&mut self, config: Arc<Config>) -> Result<()> {
        info!("Initializing SystemCoordinator...");

        let state = AppStateProvider::new(config)
            .provide()
            .await
            .context("Failed to initialize application state")?;

        self.initialize_with(state).await
    }

    /// Registers every service around an already built state.
    pub async fn initialize_with(&mut self, state: Arc<AppState>) -> Result<()> {
        self.task_manager = TaskManager::with_shutdown_deadline(state.config.shutdown_deadline());
        self.timeout = state.config.timeout();

        self.register_service_providers(state)
            .await
            .context("Failed to register service providers")?;

        info!("SystemCoordinator initialization completed");
        Ok(())
    }

    /// Registers all service providers with prioritization.
    async fn register_service_providers(&mut self, state: Arc<AppState>) -> Result<()> {
        let mut providers: Vec<Box<dyn ServiceProvider>> = vec![
            Box::new(StateMonitorServiceProvider::new(
                state.clone(),
                self.event_bus.clone(),
            )),
            Box::new(DeviceLinkServiceProvider::new(state.clone())),
        ];

        if state.config.cycle.enabled {
            providers.push(Box::new(CycleSchedulerServiceProvider::new(state.clone())));
        } else {
            info!("Compressor cycling disabled");
        }

        if state.config.bridge.enabled {
            match AccessoryBridgeServiceProvider::new(state.clone(), self.event_bus.clone()).await
            {
                Ok(provider) => providers.push(Box::new(provider)),
                Err(e) => {
                    warn!("Failed to create D-Bus bridge: {e:#}, skipping D-Bus service");
                }
            }
        }

        providers.sort_by_key(|b| std::cmp::Reverse(b.priority()));
        self.service_providers = providers;

        info!(
            "Registered {} service providers in priority order",
            self.service_providers.len()
        );

        Ok(())
    }

    /// Starts all registered services in priority order, then the signal
    /// listener.
    ///
    /// Critical services must start successfully, while non-critical services
    /// can fail without stopping the system.
    pub async fn start_all_services(&mut self) -> Result<()> {
        info!(
            "Starting {} services in priority order...",
            self.service_providers.len()
        );

        for provider in &self.service_providers {
            let is_critical = provider.is_critical();

            match provider.start(&mut self.task_manager).await {
                Ok(()) => {
                    info!(
                        "Service '{}' started successfully (priority: {}, critical: {})",
                        provider.name(),
                        provider.priority(),
                        is_critical
                    );
                }
                Err(e) if is_critical => {
                    // Drain whatever already started before giving up.
                    if let Err(shutdown_err) = self.task_manager.shutdown_all().await {
                        warn!("Shutdown after failed startup reported: {shutdown_err:#}");
                    }
                    return Err(e).with_context(|| {
                        format!("Critical service '{}' failed to start", provider.name())
                    });
                }
                Err(e) => {
                    warn!("Non-critical service '{}' failed to start: {e:#}", provider.name());
                }
            }
        }

        spawn_signal_listener(self.task_manager.global_token.clone())?;

        info!("All critical services started successfully");
        Ok(())
    }

    /// Waits for a reason to stop, then shuts everything down.
    ///
    /// Returns the first error reported by a service during shutdown.
    pub async fn run_main_loop(&mut self) -> Result<()> {
        let mut event_rx = self.event_bus.subscribe();
        let root = self.task_manager.global_token.clone();
        let timeout = self.timeout;
        let overall = async move {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => pending().await,
            }
        };
        tokio::pin!(overall);

        info!("Starting main event loop");
        loop {
            tokio::select! {
                () = root.cancelled() => {
                    info!("Root cancelled, shutting down");
                    break;
                }
                () = &mut overall => {
                    info!("Program timeout reached, shutting down");
                    break;
                }
                event = event_rx.recv() => match event {
                    Ok(Event::ShutdownRequested) => {
                        info!("Stop requested, shutting down");
                        break;
                    }
                    Ok(Event::StatusUpdated(report)) => {
                        debug!("Status: {:.1}°C, on={}", report.temperature, report.settings.on);
                    }
                    Err(RecvError::Lagged(n)) => warn!("Event bus lagged by {n} messages"),
                    Err(RecvError::Closed) => {
                        warn!("Event bus closed");
                        break;
                    }
                }
            }
        }
        info!("Main event loop terminated");

        self.shutdown().await
    }

    async fn shutdown(&mut self) -> Result<()> {
        info!("Initiating graceful shutdown...");
        self.task_manager.shutdown_all().await?;
        info!("Shutdown complete");
        Ok(())
    }

    pub const fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn running_services(&self) -> Vec<&'static str> {
        self.service_providers.iter().map(|p| p.name()).collect()
    }
}
