//! OS termination signals.

use anyhow::{Context, Result};
use log::{debug, info, trace};
use tokio::{
    signal::unix::{SignalKind, signal},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

/// Spawns a listener that cancels `root` on SIGTERM, SIGHUP, SIGINT or
/// SIGQUIT.
///
/// Handlers are installed before this returns, so a signal delivered right
/// after startup is not missed. The listener also exits quietly when `root`
/// is cancelled by someone else.
pub fn spawn_signal_listener(root: CancellationToken) -> Result<JoinHandle<()>> {
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    let mut interrupt =
        signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut quit = signal(SignalKind::quit()).context("Failed to install SIGQUIT handler")?;

    Ok(tokio::spawn(async move {
        trace!("Listening for signals");
        let received = tokio::select! {
            _ = terminate.recv() => "SIGTERM",
            _ = hangup.recv() => "SIGHUP",
            _ = interrupt.recv() => "SIGINT",
            _ = quit.recv() => "SIGQUIT",
            () = root.cancelled() => {
                debug!("Signal listener stopped");
                return;
            }
        };

        info!("Got signal {received}, initiating graceful shutdown...");
        root.cancel();
    }))
}
