//! Application state provider for dependency injection.

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::{app_context::AppState, config::Config, providers::traits::AsyncProvider};

/// Provider for creating the shared application state.
pub struct AppStateProvider {
    config: Arc<Config>,
}

impl AppStateProvider {
    pub const fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AsyncProvider<Arc<AppState>> for AppStateProvider {
    async fn provide(&self) -> Result<Arc<AppState>> {
        let app_state = AppState::new(self.config.clone());
        info!("Using {}", app_state.device_link.describe());
        Ok(Arc::new(app_state))
    }
}
