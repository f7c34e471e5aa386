//! Application entry point and builder pattern implementation.

use std::sync::Arc;

use crate::{config::Config, coordinator::SystemCoordinator};
use anyhow::Result;

/// Main application structure that orchestrates all daemon components.
///
/// # Example
///
/// ```no_run
/// use fridged::application::Application;
/// use fridged::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load(None)?;
/// let mut app = Application::builder()
///     .with_config(config)
///     .build()?;
///
/// app.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct Application {
    pub coordinator: SystemCoordinator,
    config: Arc<Config>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Runs the complete daemon lifecycle: initialize, start services, and run main loop.
    pub async fn run(&mut self) -> Result<()> {
        self.coordinator.initialize(self.config.clone()).await?;

        self.coordinator.start_all_services().await?;

        self.coordinator.run_main_loop().await
    }
}

pub struct ApplicationBuilder {
    config: Option<Config>,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self { config: None }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the Application, validating the configuration first.
    pub fn build(self) -> Result<Application> {
        let config = self
            .config
            .ok_or_else(|| anyhow::anyhow!("Configuration is required"))?;
        config.validate()?;

        Ok(Application {
            coordinator: SystemCoordinator::new(),
            config: Arc::new(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn build_requires_config() {
        assert!(Application::builder().build().is_err());
    }

    #[test]
    fn build_rejects_invalid_config() {
        let mut config = Config::default();
        config.shutdown_deadline_seconds = 0;

        assert!(Application::builder().with_config(config).build().is_err());
    }

    #[tokio::test(start_paused = true)]
    #[serial]
    async fn runs_until_timeout_with_simulated_link() {
        let mut config = Config::default();
        config.timeout_seconds = 30;
        config.bridge.enabled = false;

        let mut app = Application::builder().with_config(config).build().unwrap();
        app.run().await.unwrap();
    }
}
