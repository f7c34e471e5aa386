use log::{error, warn};
use zbus::{interface, object_server::SignalEmitter};

use crate::{
    event::{Event, EventBus},
    fridge::Fridge,
    status::StatusReport,
};

pub const OBJECT_PATH: &str = "/io/github/fridged";
pub const SERVICE_NAME: &str = "io.github.fridged";

pub struct FridgeInterface {
    pub fridge: Fridge,
    pub event_bus: EventBus,
    pub version: String,
}

impl FridgeInterface {
    pub fn new(fridge: Fridge, event_bus: EventBus, version: String) -> Self {
        Self {
            fridge,
            event_bus,
            version,
        }
    }

    fn request_stop(&self) {
        if let Err(e) = self.event_bus.publish(Event::ShutdownRequested) {
            warn!("Nobody to handle stop request: {e}");
        }
    }
}

#[interface(name = "io.github.fridged1")]
impl FridgeInterface {
    #[zbus(signal)]
    pub async fn stopped(emitter: &SignalEmitter<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn status_changed(
        emitter: &SignalEmitter<'_>,
        report: StatusReport,
    ) -> zbus::Result<()>;

    async fn stop(
        &self,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<()> {
        self.request_stop();
        if let Err(e) = emitter.stopped().await {
            warn!("Failed to emit Stopped: {e}");
        }

        Ok(())
    }

    async fn set_on(&self, on: bool) {
        self.fridge.set_on(on).await;
    }

    async fn set_eco_mode(&self, eco_mode: bool) {
        self.fridge.set_eco_mode(eco_mode).await;
    }

    async fn set_locked(&self, locked: bool) {
        self.fridge.set_locked(locked).await;
    }

    #[zbus(property)]
    async fn version(&self) -> String {
        self.version.clone()
    }

    #[zbus(property)]
    async fn is_on(&self) -> bool {
        self.fridge.settings().await.is_on()
    }

    #[zbus(property)]
    async fn is_eco_mode(&self) -> bool {
        self.fridge.settings().await.is_eco_mode()
    }

    #[zbus(property)]
    async fn is_locked(&self) -> bool {
        self.fridge.settings().await.is_locked()
    }

    /// Set-point in degrees Celsius.
    #[zbus(property)]
    async fn temp_set(&self) -> f64 {
        self.fridge.settings().await.target_celsius()
    }

    #[zbus(property)]
    async fn temperature(&self) -> f64 {
        self.fridge.status_report().await.temperature
    }

    #[zbus(property)]
    async fn freezer_capable(&self) -> bool {
        self.fridge.settings().await.freezer_capable()
    }

    #[zbus(property)]
    async fn status_json(&self) -> String {
        let report = self.fridge.status_report().await;
        match serde_json::to_string(&report) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize status: {e}");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fridge::FridgeParts,
        status::{FREEZING_TEMP_SET, Settings},
    };
    use pretty_assertions::assert_eq;

    fn interface() -> (FridgeInterface, FridgeParts) {
        let parts = Fridge::build();
        let iface = FridgeInterface::new(
            parts.fridge.clone(),
            EventBus::new(),
            "0.1.0".to_string(),
        );
        (iface, parts)
    }

    #[tokio::test]
    async fn properties_reflect_shared_state() {
        let (iface, parts) = interface();
        let settings = Settings {
            on: 1,
            eco_mode: 1,
            locked: 0,
            temp_set: FREEZING_TEMP_SET,
            e5: 1,
        };
        parts
            .fridge
            .install(StatusReport::new(settings, -8.5))
            .await;

        assert!(iface.is_on().await);
        assert!(iface.is_eco_mode().await);
        assert!(!iface.is_locked().await);
        assert!(iface.freezer_capable().await);
        assert_eq!(iface.temp_set().await, -11.0);
        assert_eq!(iface.temperature().await, -8.5);
        assert_eq!(iface.version().await, "0.1.0");
    }

    #[tokio::test]
    async fn status_json_carries_settings_and_temperature() {
        let (iface, parts) = interface();
        let report = StatusReport::new(Settings::default().with_on(true), 5.25);
        parts.fridge.install(report).await;

        let json: serde_json::Value = serde_json::from_str(&iface.status_json().await).unwrap();
        assert_eq!(json["settings"]["on"], 1);
        assert_eq!(json["temperature"], 5.25);
    }

    #[tokio::test]
    async fn methods_enqueue_commands() {
        let (iface, mut parts) = interface();
        parts
            .fridge
            .install(StatusReport::new(Settings::default().with_on(true), 4.0))
            .await;

        let consumer = tokio::spawn(async move { parts.ports.commands.recv().await });
        iface.set_locked(true).await;

        let sent = consumer.await.unwrap().unwrap();
        assert_eq!(sent, Settings::default().with_on(true).with_locked(true));
    }

    #[tokio::test]
    async fn stop_request_reaches_event_bus() {
        let (iface, _parts) = interface();
        let mut events = iface.event_bus.subscribe();

        iface.request_stop();

        assert!(matches!(
            events.try_recv().unwrap(),
            Event::ShutdownRequested
        ));
    }
}
