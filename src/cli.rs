use clap::Parser;
use std::path::PathBuf;

use crate::config::{Config, DeviceCfg};

/// Keep-alive and control daemon for 12 V compressor fridges
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML config file path
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Detach from the terminal and log to syslog
    #[arg(short = 'd', long = "daemonize", default_value = "false")]
    pub daemonize: bool,

    /// Adapter name, e.g. hci0
    #[arg(long = "adapter", env = "ADAPTER_NAME")]
    pub adapter: Option<String>,

    /// Address of the remote peripheral
    #[arg(long = "fridgeaddr", env = "FRIDGE_ADDR")]
    pub address: Option<String>,

    /// Overall program timeout in seconds (0 runs until signalled)
    #[arg(long = "timeout", env = "TIMEOUT_SEC")]
    pub timeout: Option<u64>,

    /// Status polling interval in seconds
    #[arg(long = "pollrate", env = "POLLRATE_SEC")]
    pub poll_rate: Option<u64>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long = "log-level", env = "LOGLEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Applies command-line and environment overrides on top of `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }

        match &mut config.device {
            DeviceCfg::Simulated {
                adapter,
                address,
                poll_rate_ms,
                ..
            } => {
                if let Some(value) = &self.adapter {
                    *adapter = value.clone();
                }
                if let Some(value) = &self.address {
                    *address = value.clone();
                }
                if let Some(secs) = self.poll_rate {
                    *poll_rate_ms = secs.saturating_mul(1000);
                }
            }
        }
    }
}
