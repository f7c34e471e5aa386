//! Dependency injection providers for service management.

pub mod app_state;
pub mod bridge;
pub mod cycle;
pub mod device_link;
pub mod state_monitor;
pub mod traits;

pub use app_state::AppStateProvider;
pub use bridge::AccessoryBridgeServiceProvider;
pub use cycle::CycleSchedulerServiceProvider;
pub use device_link::DeviceLinkServiceProvider;
pub use state_monitor::StateMonitorServiceProvider;
pub use traits::{AsyncProvider, ServiceProvider};
