use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    app_context::AppState, cycle::run_cycle_scheduler, providers::traits::ServiceProvider,
    task_manager::TaskManager,
};

/// Compressor cycle scheduler service provider.
///
/// # Priority and Criticality
///
/// - **Priority**: 5
/// - **Critical**: No
pub struct CycleSchedulerServiceProvider {
    state: Arc<AppState>,
}

impl CycleSchedulerServiceProvider {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ServiceProvider for CycleSchedulerServiceProvider {
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
        let fridge = self.state.fridge.clone();
        let on_time = self.state.config.cycle.on_time();
        let period = self.state.config.cycle.interval();

        task_manager
            .spawn_task(self.name().to_string(), move |cancel_token| async move {
                run_cycle_scheduler(fridge, on_time, period, cancel_token).await;
                Ok(())
            })
            .await
    }

    fn name(&self) -> &'static str {
        "CycleScheduler"
    }

    fn priority(&self) -> i32 {
        5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        status::{FREEZING_TEMP_SET, Settings, StatusReport},
    };
    use pretty_assertions::assert_eq;

    #[tokio::test(start_paused = true)]
    async fn scheduler_task_cycles_with_configured_on_time() {
        let mut config = Config::default();
        config.cycle.on_seconds = 2;
        config.cycle.interval_seconds = 600;
        let state = Arc::new(AppState::new(Arc::new(config)));
        let mut ports = state.take_ports().await.unwrap();

        let prev = Settings {
            temp_set: 7,
            e5: 1,
            ..Settings::default()
        };
        state.fridge.install(StatusReport::new(prev, 12.0)).await;

        let mut task_manager = TaskManager::new();
        CycleSchedulerServiceProvider::new(state.clone())
            .start(&mut task_manager)
            .await
            .unwrap();

        let started = tokio::time::Instant::now();
        assert_eq!(
            ports.commands.recv().await.unwrap().temp_set,
            FREEZING_TEMP_SET
        );
        assert_eq!(ports.commands.recv().await, Some(prev));
        assert!(started.elapsed() >= std::time::Duration::from_secs(2));

        task_manager.shutdown_all().await.unwrap();
    }
}
