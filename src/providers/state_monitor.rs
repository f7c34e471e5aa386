use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    app_context::AppState, event::EventBus, providers::traits::ServiceProvider,
    task_manager::TaskManager,
};

/// State monitor service provider.
///
/// Drains the inbound status stream into the shared fridge state. The task
/// deliberately ignores its cancellation token: it ends when the device link
/// drops its end of the stream, so no report observed before shutdown is
/// lost.
///
/// # Priority and Criticality
///
/// - **Priority**: 10 (highest, the stream must be drained before the link
///   starts publishing)
/// - **Critical**: Yes
pub struct StateMonitorServiceProvider {
    state: Arc<AppState>,
    event_bus: EventBus,
}

impl StateMonitorServiceProvider {
    pub fn new(state: Arc<AppState>, event_bus: EventBus) -> Self {
        Self { state, event_bus }
    }
}

#[async_trait]
impl ServiceProvider for StateMonitorServiceProvider {
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
        let inlet = self
            .state
            .take_inlet()
            .await
            .ok_or_else(|| anyhow!("Status stream already taken"))?;
        let fridge = self.state.fridge.clone();
        let event_bus = self.event_bus.clone();

        task_manager
            .spawn_task(self.name().to_string(), |_cancel_token| async move {
                fridge.monitor(inlet, &event_bus).await;
                Ok(())
            })
            .await
    }

    fn name(&self) -> &'static str {
        "StateMonitor"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn is_critical(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        event::Event,
        status::{Settings, StatusReport},
    };
    use pretty_assertions::assert_eq;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(Arc::new(Config::default())))
    }

    #[tokio::test]
    async fn installs_reports_and_outlives_cancellation() {
        let state = state();
        let event_bus = EventBus::new();
        let mut events = event_bus.subscribe();
        let mut task_manager = TaskManager::new();

        let provider = StateMonitorServiceProvider::new(state.clone(), event_bus);
        provider.start(&mut task_manager).await.unwrap();
        assert!(task_manager.is_running("StateMonitor"));

        let ports = state.take_ports().await.unwrap();
        let report = StatusReport::new(Settings::default().with_on(true), 3.5);
        ports.status_tx.send(report).await.unwrap();

        match events.recv().await.unwrap() {
            Event::StatusUpdated(received) => assert_eq!(received, report),
            other => panic!("Expected StatusUpdated, got {other:?}"),
        }
        assert_eq!(state.fridge.status_report().await, report);

        task_manager.global_token.cancel();
        let late = StatusReport::new(Settings::default().with_on(false).with_locked(true), 4.0);
        ports.status_tx.send(late).await.unwrap();
        drop(ports);

        task_manager.shutdown_all().await.unwrap();
        assert_eq!(state.fridge.status_report().await, late);
    }

    #[tokio::test]
    async fn second_start_fails() {
        let state = state();
        let mut task_manager = TaskManager::new();

        let provider = StateMonitorServiceProvider::new(state.clone(), EventBus::new());
        provider.start(&mut task_manager).await.unwrap();

        let again = StateMonitorServiceProvider::new(state.clone(), EventBus::new());
        assert!(again.start(&mut TaskManager::new()).await.is_err());

        drop(state.take_ports().await);
        task_manager.shutdown_all().await.unwrap();
    }
}
