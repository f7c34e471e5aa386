//! Configuration management for the fridged daemon.
//!
//! Handles loading, parsing, and validation of the YAML configuration file.
//! The configuration is built once at startup (file, then command-line and
//! environment overrides) and shared read-only afterwards.

use anyhow::{Context, Result, anyhow, bail};
use log::{LevelFilter, info};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

/// Main configuration structure for the fridged daemon.
///
/// # Example
///
/// ```yaml
/// version: 1
/// timeout_seconds: 1200
/// shutdown_deadline_seconds: 30
/// log_level: info
///
/// device:
///   kind: simulated
///   adapter: hci0
///   address: "C8:FD:19:00:00:01"
///   poll_rate_ms: 1000
///
/// cycle:
///   enabled: true
///   on_seconds: 15
///   interval_seconds: 28800
///
/// bridge:
///   enabled: true
///   bus: session
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version for compatibility checking.
    pub version: u8,

    /// Overall runtime bound in seconds. Zero disables it.
    #[serde(default = "defaults::timeout_seconds")]
    pub timeout_seconds: u64,

    /// Hard deadline for draining subordinates once shutdown starts.
    #[serde(default = "defaults::shutdown_deadline_seconds")]
    pub shutdown_deadline_seconds: u64,

    /// Log level name (off, error, warn, info, debug, trace).
    #[serde(default = "defaults::log_level")]
    pub log_level: String,

    /// Device link selection.
    #[serde(default)]
    pub device: DeviceCfg,

    /// Compressor keep-alive cycle.
    #[serde(default)]
    pub cycle: CycleCfg,

    /// D-Bus accessory bridge.
    #[serde(default)]
    pub bridge: BridgeCfg,
}

/// Device link configuration variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DeviceCfg {
    /// In-process fridge model.
    Simulated {
        /// Adapter name, e.g. hci0.
        #[serde(default = "defaults::adapter")]
        adapter: String,

        /// Address of the remote peripheral.
        #[serde(default)]
        address: String,

        /// Status report interval in milliseconds.
        #[serde(default = "defaults::poll_rate_ms")]
        poll_rate_ms: u64,

        /// Temperature the cabinet settles at while off.
        #[serde(default = "defaults::ambient_celsius")]
        ambient_celsius: f64,

        /// Whether the modelled unit supports freezer mode.
        #[serde(default = "defaults::freezer_capable")]
        freezer_capable: bool,
    },
}

impl Default for DeviceCfg {
    fn default() -> Self {
        Self::Simulated {
            adapter: defaults::adapter(),
            address: String::new(),
            poll_rate_ms: defaults::poll_rate_ms(),
            ambient_celsius: defaults::ambient_celsius(),
            freezer_capable: defaults::freezer_capable(),
        }
    }
}

impl DeviceCfg {
    pub fn poll_rate(&self) -> Duration {
        match self {
            Self::Simulated { poll_rate_ms, .. } => Duration::from_millis(*poll_rate_ms),
        }
    }
}

/// Keep-alive cycle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleCfg {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// How long the compressor is forced on.
    #[serde(default = "defaults::cycle_on_seconds")]
    pub on_seconds: u64,

    /// Period between cycles.
    #[serde(default = "defaults::cycle_interval_seconds")]
    pub interval_seconds: u64,
}

impl Default for CycleCfg {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            on_seconds: defaults::cycle_on_seconds(),
            interval_seconds: defaults::cycle_interval_seconds(),
        }
    }
}

impl CycleCfg {
    pub fn on_time(&self) -> Duration {
        Duration::from_secs(self.on_seconds)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// Message bus the accessory bridge attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusKind {
    #[default]
    Session,
    System,
}

/// D-Bus accessory bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeCfg {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub bus: BusKind,
}

impl Default for BridgeCfg {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            bus: BusKind::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            timeout_seconds: defaults::timeout_seconds(),
            shutdown_deadline_seconds: defaults::shutdown_deadline_seconds(),
            log_level: defaults::log_level(),
            device: DeviceCfg::default(),
            cycle: CycleCfg::default(),
            bridge: BridgeCfg::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from the standard locations.
    ///
    /// Searches in the following order:
    /// 1. Provided path parameter
    /// 2. FRIDGED_CONFIG environment variable
    /// 3. XDG_CONFIG_HOME/fridged/config.yml or ~/.config/fridged/config.yml
    /// 4. /etc/fridged/config.yml
    ///
    /// Falls back to the defaults when no file exists in any standard
    /// location. An explicit path that cannot be read is an error.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let Some(config_path) = path.or_else(locate_config) else {
            info!("No configuration file found, using defaults");
            return Ok(Self::default());
        };

        info!("Loading config from: {}", config_path.display());
        Self::load_from_path(&config_path)
    }

    /// Loads configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML in: {}", path.display()))?;

        if config.version != 1 {
            bail!(
                "Unsupported config version {} in file: {}",
                config.version,
                path.display()
            );
        }

        config
            .validate()
            .with_context(|| format!("Configuration validation failed for: {}", path.display()))?;

        Ok(config)
    }

    /// Validates the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.shutdown_deadline_seconds == 0 {
            bail!("shutdown_deadline_seconds must be positive");
        }

        if self.device.poll_rate().is_zero() {
            bail!("Device poll rate must be positive");
        }

        if self.cycle.enabled {
            if self.cycle.on_seconds == 0 {
                bail!("Cycle on_seconds must be positive");
            }
            if self.cycle.on_seconds >= self.cycle.interval_seconds {
                bail!(
                    "Cycle on_seconds ({}) must be shorter than interval_seconds ({})",
                    self.cycle.on_seconds,
                    self.cycle.interval_seconds
                );
            }
        }

        self.level_filter()?;
        Ok(())
    }

    /// Overall runtime bound, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }

    pub fn shutdown_deadline(&self) -> Duration {
        Duration::from_secs(self.shutdown_deadline_seconds)
    }

    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|e| anyhow!("Unknown log level '{}': {e}", self.log_level))
    }
}

mod defaults {
    pub fn timeout_seconds() -> u64 {
        20 * 60
    }

    pub fn shutdown_deadline_seconds() -> u64 {
        30
    }

    pub fn log_level() -> String {
        "info".to_string()
    }

    pub fn adapter() -> String {
        "hci0".to_string()
    }

    pub fn poll_rate_ms() -> u64 {
        1000
    }

    pub fn ambient_celsius() -> f64 {
        22.0
    }

    pub fn freezer_capable() -> bool {
        true
    }

    pub fn enabled() -> bool {
        true
    }

    pub fn cycle_on_seconds() -> u64 {
        15
    }

    pub fn cycle_interval_seconds() -> u64 {
        8 * 60 * 60
    }
}

fn locate_config() -> Option<PathBuf> {
    if let Ok(env_path) = env::var("FRIDGED_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    if let Some(mut cfg_dir) = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| Path::new(&h).join(".config")))
    {
        cfg_dir.push("fridged/config.yml");
        if cfg_dir.exists() {
            return Some(cfg_dir);
        }
    }

    let etc = Path::new("/etc/fridged/config.yml");
    etc.exists().then(|| etc.to_path_buf())
}
