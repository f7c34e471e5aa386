//! # fridged
//!
//! A Linux daemon that keeps a 12 V compressor fridge (and the power bank
//! feeding it) awake, and exposes the fridge over D-Bus.
//!
//! ## Features
//!
//! - **Shared State**: last status report behind a reader/writer lock,
//!   updated only from the device link's status stream
//! - **Command Channel**: rendezvous hand-off of settings to the device link
//! - **Compressor Cycling**: periodic forced cold cycle with timed reversion
//! - **Supervision**: single cancellation tree, fail-fast device link and a
//!   hard shutdown deadline
//! - **D-Bus Interface**: remote on/off, eco mode, panel lock and status
//!
//! ## Architecture
//!
//! - [`SystemCoordinator`](coordinator::SystemCoordinator) - Main lifecycle manager
//! - [`TaskManager`](task_manager::TaskManager) - Cancellation tree and shutdown
//! - [`Fridge`](fridge::Fridge) - Shared state, state monitor and mutators
//! - [`DeviceLink`](drivers::DeviceLink) - Transport to the fridge
//! - [`EventBus`](event::EventBus) - Inter-service communication
//!
//! ## Example
//!
//! ```no_run
//! use fridged::{application::Application, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     Application::builder()
//!         .with_config(config)
//!         .build()?
//!         .run()
//!         .await
//! }
//! ```

pub mod app_context;
pub mod application;
pub mod cli;
pub mod command;
pub mod config;
pub mod coordinator;
pub mod cycle;
pub mod drivers;
pub mod event;
pub mod fridge;
pub mod interface;
pub mod providers;
pub mod signals;
pub mod status;
pub mod task_manager;
pub mod watchdog;
