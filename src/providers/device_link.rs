use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{error, info};
use std::sync::Arc;

use crate::{
    app_context::AppState, providers::traits::ServiceProvider, task_manager::TaskManager,
};

/// Device link service provider.
///
/// Runs the configured [`DeviceLink`](crate::drivers::DeviceLink). The daemon
/// cannot do anything useful without it, so the link is spawned fail-fast:
/// whenever it exits, for any reason, every other service is cancelled.
///
/// # Priority and Criticality
///
/// - **Priority**: 9
/// - **Critical**: Yes
pub struct DeviceLinkServiceProvider {
    state: Arc<AppState>,
}

impl DeviceLinkServiceProvider {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ServiceProvider for DeviceLinkServiceProvider {
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
        let ports = self
            .state
            .take_ports()
            .await
            .ok_or_else(|| anyhow!("Device link ports already taken"))?;
        let link = self.state.device_link.clone();

        task_manager
            .spawn_fail_fast_task(self.name().to_string(), |cancel_token| async move {
                info!("Connecting to {}", link.describe());
                let result = link.run(cancel_token.clone(), ports).await;

                match &result {
                    Ok(()) if cancel_token.is_cancelled() => {
                        info!("Device link stopped");
                    }
                    Ok(()) => info!("Device link finished on its own"),
                    Err(e) => error!("Device link failed: {e:#}"),
                }
                result
            })
            .await
    }

    fn name(&self) -> &'static str {
        "DeviceLink"
    }

    fn priority(&self) -> i32 {
        9
    }

    fn is_critical(&self) -> bool {
        true
    }
}
