//! Application state shared by every service.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    config::Config,
    drivers::{self, DeviceLink, LinkPorts},
    fridge::{Fridge, FridgeParts},
    status::StatusReport,
};

/// Shared application state containing all runtime data.
///
/// The fridge handle is cloned freely. The inbound status stream and the
/// device-link ports are one-shot: the service that runs them takes them out,
/// so a second start finds nothing to run.
pub struct AppState {
    pub config: Arc<Config>,
    pub fridge: Fridge,
    pub device_link: Arc<dyn DeviceLink>,
    inlet: Mutex<Option<ReceiverStream<StatusReport>>>,
    ports: Mutex<Option<LinkPorts>>,
}

impl AppState {
    /// Creates the state with the device link selected by `config`.
    pub fn new(config: Arc<Config>) -> Self {
        let device_link: Arc<dyn DeviceLink> = Arc::from(drivers::from_cfg(&config.device));
        Self::with_device_link(config, device_link)
    }

    /// Creates the state around an explicit device link.
    pub fn with_device_link(config: Arc<Config>, device_link: Arc<dyn DeviceLink>) -> Self {
        let FridgeParts {
            fridge,
            inlet,
            ports,
        } = Fridge::build();

        Self {
            config,
            fridge,
            device_link,
            inlet: Mutex::new(Some(inlet)),
            ports: Mutex::new(Some(ports)),
        }
    }

    /// Takes the inbound status stream, if nobody has yet.
    pub async fn take_inlet(&self) -> Option<ReceiverStream<StatusReport>> {
        self.inlet.lock().await.take()
    }

    /// Takes the device-link ports, if nobody has yet.
    pub async fn take_ports(&self) -> Option<LinkPorts> {
        self.ports.lock().await.take()
    }
}
