use anyhow::Result;
use async_trait::async_trait;

use crate::task_manager::TaskManager;

/// Base trait for providers that can create components asynchronously.
///
/// # Example
///
/// ```no_run
/// use fridged::providers::traits::AsyncProvider;
///
/// struct AdapterNameProvider;
///
/// #[async_trait::async_trait]
/// impl AsyncProvider<String> for AdapterNameProvider {
///     async fn provide(&self) -> anyhow::Result<String> {
///         Ok("hci0".to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncProvider<T> {
    async fn provide(&self) -> Result<T>;
}

/// Trait for services that can be started through TaskManager.
///
/// Services start in descending priority order. A critical service that
/// fails to start aborts startup; any other failure is logged and skipped.
///
/// # Example
///
/// ```no_run
/// use fridged::providers::traits::ServiceProvider;
/// use fridged::task_manager::TaskManager;
/// use anyhow::Result;
///
/// struct HeartbeatService;
///
/// #[async_trait::async_trait]
/// impl ServiceProvider for HeartbeatService {
///     async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
///         task_manager.spawn_task("heartbeat".to_string(), |token| async move {
///             token.cancelled().await;
///             Ok(())
///         }).await
///     }
///
///     fn name(&self) -> &'static str { "HeartbeatService" }
/// }
/// ```
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    /// Starts the service in TaskManager.
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()>;

    /// Returns service name for logging and management.
    fn name(&self) -> &'static str;

    /// Returns startup priority (higher numbers start first).
    fn priority(&self) -> i32 {
        0
    }

    /// Indicates if service is critical for system operation.
    fn is_critical(&self) -> bool {
        false
    }
}
