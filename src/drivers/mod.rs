//! Device-link abstraction.
//!
//! A device link owns the connection to the fridge: it publishes every status
//! report it observes into the inbound stream and applies every command it
//! receives. The daemon treats it as a critical subordinate.

pub mod simulated;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{command::CommandReceiver, config::DeviceCfg, status::StatusReport};

/// Channels handed to a device link.
///
/// Dropping `status_tx` closes the inbound status stream, which is what ends
/// the state monitor.
#[derive(Debug)]
pub struct LinkPorts {
    pub status_tx: mpsc::Sender<StatusReport>,
    pub commands: CommandReceiver,
}

/// Trait for transports that connect the daemon to the fridge.
///
/// # Example
///
/// ```no_run
/// use fridged::drivers::{DeviceLink, LinkPorts};
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Debug)]
/// struct NullLink;
///
/// #[async_trait::async_trait]
/// impl DeviceLink for NullLink {
///     async fn run(&self, cancel_token: CancellationToken, _ports: LinkPorts) -> anyhow::Result<()> {
///         cancel_token.cancelled().await;
///         Ok(())
///     }
///     fn describe(&self) -> String { "null".into() }
/// }
/// ```
#[async_trait]
pub trait DeviceLink: Send + Sync + core::fmt::Debug {
    /// Runs the link until cancelled or failed.
    ///
    /// Returning `Ok(())` after cancellation is the expected shutdown path.
    async fn run(&self, cancel_token: CancellationToken, ports: LinkPorts) -> Result<()>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Builds the device link selected by the configuration.
pub fn from_cfg(cfg: &DeviceCfg) -> Box<dyn DeviceLink> {
    match cfg {
        DeviceCfg::Simulated {
            adapter,
            address,
            poll_rate_ms,
            ambient_celsius,
            freezer_capable,
        } => Box::new(simulated::SimulatedLink::new(
            adapter.clone(),
            address.clone(),
            std::time::Duration::from_millis(*poll_rate_ms),
            *ambient_celsius,
            *freezer_capable,
        )),
    }
}
