//! Task management for async service lifecycle.
//!
//! The [`TaskManager`] is the root of the cancellation tree. Every
//! subordinate gets a child of the global token and is tracked until it
//! exits; shutdown cancels the root and waits for all of them under a hard
//! deadline enforced by a [`Watchdog`].

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::watchdog::Watchdog;

/// Default hard deadline for draining subordinates.
pub const DEFAULT_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

/// What a task's exit means for the rest of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// A clean exit leaves everyone else running; an error or panic still
    /// cancels the root.
    Independent,
    /// Any exit of the task, including success or panic, cancels the root.
    FailFast,
}

/// Manages async tasks with proper lifecycle and error handling.
///
/// Provides centralized management of background tasks with graceful shutdown
/// capabilities and error propagation.
pub struct TaskManager {
    tasks: HashMap<String, TaskInfo>,
    pub global_token: CancellationToken,
    shutdown_deadline: Duration,
}

impl TaskManager {
    /// Creates a new TaskManager with the default shutdown deadline.
    pub fn new() -> Self {
        Self::with_shutdown_deadline(DEFAULT_SHUTDOWN_DEADLINE)
    }

    pub fn with_shutdown_deadline(shutdown_deadline: Duration) -> Self {
        Self {
            tasks: HashMap::new(),
            global_token: CancellationToken::new(),
            shutdown_deadline,
        }
    }

    /// Spawns and registers a task with the given name.
    ///
    /// The task will be tracked and can be shut down gracefully.
    pub async fn spawn_task<F, Fut>(&mut self, name: String, task_fn: F) -> Result<()>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.spawn_with_policy(name, ExitPolicy::Independent, task_fn)
    }

    /// Spawns a task whose exit, for any reason, cancels every other task.
    pub async fn spawn_fail_fast_task<F, Fut>(&mut self, name: String, task_fn: F) -> Result<()>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.spawn_with_policy(name, ExitPolicy::FailFast, task_fn)
    }

    fn spawn_with_policy<F, Fut>(
        &mut self,
        name: String,
        policy: ExitPolicy,
        task_fn: F,
    ) -> Result<()>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        if self.tasks.contains_key(&name) {
            anyhow::bail!("Task '{}' is already registered", name);
        }

        let task_token = self.global_token.child_token();
        let global_token = self.global_token.clone();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            // Cancels the root on the way out, panics included.
            let guard = global_token.clone().drop_guard();

            info!("Starting task: {}", task_name);
            let result = task_fn(task_token).await;
            match &result {
                Ok(()) => info!("Task '{}' completed successfully", task_name),
                Err(e) => error!("Task '{}' failed: {:#}", task_name, e),
            }

            if policy == ExitPolicy::Independent && result.is_ok() {
                let _ = guard.disarm();
            } else if !global_token.is_cancelled() {
                warn!("Task '{}' exited, cancelling all tasks", task_name);
            }
            result
        });

        self.tasks.insert(name.clone(), TaskInfo { handle, policy });

        info!("Task '{}' spawned ({:?})", name, policy);
        Ok(())
    }

    /// Shuts down all registered tasks, aborting the process if they do not
    /// finish within the shutdown deadline.
    pub async fn shutdown_all(&mut self) -> Result<()> {
        self.shutdown_all_with(Watchdog::arm).await
    }

    /// Like [`shutdown_all`](Self::shutdown_all) with a custom watchdog.
    ///
    /// `arm` is called with the shutdown deadline once the root has been
    /// cancelled.
    pub async fn shutdown_all_with<A>(&mut self, arm: A) -> Result<()>
    where
        A: FnOnce(Duration) -> Result<Watchdog>,
    {
        info!("Stopping all {} tasks", self.tasks.len());

        self.global_token.cancel();
        let watchdog = arm(self.shutdown_deadline)?;

        let result = self.drain().await;
        watchdog.disarm();
        result
    }

    /// Waits for all tasks and collects any errors.
    ///
    /// Returns the first error encountered, if any.
    async fn drain(&mut self) -> Result<()> {
        let mut first_error = None;
        let tasks: Vec<_> = self.tasks.drain().collect();

        for (name, TaskInfo { handle, policy }) in tasks {
            debug!("Waiting for task '{}'", name);
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Task '{}' ({:?}) failed during shutdown: {}", name, policy, e);
                    if first_error.is_none() {
                        first_error =
                            Some(e.context(format!("Task '{name}' ({policy:?}) failed")));
                    }
                }
                Err(e) => {
                    let error = anyhow::anyhow!("Task '{}' ({:?}) panicked: {}", name, policy, e);
                    error!("{}", error);
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }

        if let Some(error) = first_error {
            Err(error).context("One or more tasks failed during shutdown")
        } else {
            info!("All tasks stopped");
            Ok(())
        }
    }

    /// Returns the count of active tasks.
    ///
    /// Used only for testing purposes.
    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    /// Checks if a task with the given name is currently registered.
    ///
    /// Used only for testing purposes.
    #[cfg(test)]
    pub fn is_running(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    #[cfg(test)]
    pub fn policy_of(&self, name: &str) -> Option<ExitPolicy> {
        self.tasks.get(name).map(|info| info.policy)
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

struct TaskInfo {
    handle: JoinHandle<Result<()>>,
    policy: ExitPolicy,
}
