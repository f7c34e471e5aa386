//! Hard shutdown deadline.

use std::{
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use log::{debug, error};

/// Aborts the process if not disarmed before its deadline.
///
/// The countdown runs on a dedicated OS thread so it still fires when the
/// async runtime is stuck. Dropping the watchdog disarms it.
pub struct Watchdog {
    disarm: Option<mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Watchdog {
    /// Arms a watchdog that aborts the process after `deadline`.
    pub fn arm(deadline: Duration) -> Result<Self> {
        Self::arm_with(deadline, move || {
            error!("Took too long to exit ({deadline:?}), aborting");
            std::process::abort();
        })
    }

    /// Arms a watchdog that runs `on_expire` after `deadline`.
    pub fn arm_with<F>(deadline: Duration, on_expire: F) -> Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let (disarm, disarmed) = mpsc::channel::<()>();
        debug!("Waiting {deadline:?} then exiting");

        let thread = thread::Builder::new()
            .name("shutdown-watchdog".to_string())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = disarmed.recv_timeout(deadline) {
                    on_expire();
                }
            })
            .context("Failed to spawn shutdown watchdog thread")?;

        Ok(Self {
            disarm: Some(disarm),
            thread: Some(thread),
        })
    }

    /// Stops the countdown and waits for the watchdog thread to exit.
    pub fn disarm(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Dropping the sender wakes the thread with a disconnect.
        self.disarm.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}
