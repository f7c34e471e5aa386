//! In-process fridge model used when no hardware transport is configured.

use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use log::{debug, info};
use rand::Rng;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use super::{DeviceLink, LinkPorts};
use crate::status::{Settings, StatusReport};

/// Cooling rate while the compressor runs, in °C per second.
const COOLING_RATE: f64 = 0.05;
/// Warming rate toward ambient while off, in °C per second.
const WARMING_RATE: f64 = 0.02;
/// Lowest cabinet temperature the model reaches.
const FLOOR_CELSIUS: f64 = -20.0;
const JITTER: f64 = 0.05;

/// Simulated device link.
///
/// Publishes the modelled status every poll interval and applies each
/// received [`Settings`] wholesale, as a real fridge would acknowledge a
/// settings write.
#[derive(Debug, Clone)]
pub struct SimulatedLink {
    adapter: String,
    address: String,
    poll_rate: Duration,
    ambient_celsius: f64,
    initial: StatusReport,
}

impl SimulatedLink {
    pub fn new(
        adapter: String,
        address: String,
        poll_rate: Duration,
        ambient_celsius: f64,
        freezer_capable: bool,
    ) -> Self {
        let settings = Settings {
            on: 1,
            eco_mode: 0,
            locked: 0,
            temp_set: 4,
            e5: u8::from(freezer_capable),
        };

        Self {
            adapter,
            address,
            poll_rate,
            ambient_celsius,
            initial: StatusReport::new(settings, ambient_celsius),
        }
    }

    /// Overrides the state the model starts from.
    pub fn with_initial_report(mut self, report: StatusReport) -> Self {
        self.initial = report;
        self
    }

    fn step(&self, report: &StatusReport) -> f64 {
        let jitter = rand::rng().random_range(-JITTER..=JITTER);
        next_temperature(report, self.ambient_celsius, self.poll_rate, jitter)
    }
}

/// Advances the cabinet temperature by `elapsed`.
fn next_temperature(report: &StatusReport, ambient: f64, elapsed: Duration, jitter: f64) -> f64 {
    let secs = elapsed.as_secs_f64();
    let settings = &report.settings;
    let current = report.temperature;

    let (target, rate) = if settings.is_on() {
        let rate = if settings.is_eco_mode() {
            COOLING_RATE / 2.0
        } else {
            COOLING_RATE
        };
        (settings.target_celsius().max(FLOOR_CELSIUS), rate)
    } else {
        (ambient, WARMING_RATE)
    };

    let max_step = rate * secs;
    let delta = (target - current).clamp(-max_step, max_step);
    current + delta + jitter
}

#[async_trait]
impl DeviceLink for SimulatedLink {
    async fn run(&self, cancel_token: CancellationToken, ports: LinkPorts) -> Result<()> {
        info!(
            "Connecting to fridge {} via {} (simulated, poll every {:?})",
            self.address, self.adapter, self.poll_rate
        );

        let LinkPorts {
            status_tx,
            mut commands,
        } = ports;
        let mut report = self.initial;
        let mut ticker = interval(self.poll_rate);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!("Simulated link cancelled");
                    break;
                }
                command = commands.recv() => {
                    let Some(settings) = command else {
                        bail!("Command channel closed");
                    };
                    debug!("Applying settings {settings:?}");
                    report.settings = settings;
                }
                _instant = ticker.tick() => {
                    report.temperature = self.step(&report);
                    tokio::select! {
                        () = cancel_token.cancelled() => {
                            info!("Simulated link cancelled while publishing");
                            break;
                        }
                        sent = status_tx.send(report) => {
                            if sent.is_err() {
                                bail!("Status stream closed");
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn describe(&self) -> String {
        format!("simulated fridge {} on {}", self.address, self.adapter)
    }
}
