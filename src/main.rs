use std::fs::File;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use daemonize::Daemonize;
use log::{LevelFilter, info};
use syslog::{BasicLogger, Facility, Formatter3164};

use fridged::{application::Application, cli::Cli, config::Config};

const DAEMON_LOG: &str = "/var/tmp/fridged.log";

fn init_log(daemonize: bool, level: LevelFilter) -> Result<()> {
    if !daemonize {
        env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .try_init()
            .map_err(|e| anyhow!("{e}"))?;
        return Ok(());
    }

    syslog::unix(Formatter3164 {
        facility: Facility::LOG_DAEMON,
        hostname: None,
        process: "fridged".into(),
        pid: std::process::id(),
    })
    .map_err(|e| anyhow!("{e}"))
    .and_then(|logger| {
        log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
            .map(|()| log::set_max_level(level))
            .map_err(|e| anyhow!("{e}"))
    })
}

fn into_daemon() -> Result<()> {
    File::create(DAEMON_LOG)
        .and_then(|out| Ok((out.try_clone()?, out)))
        .map_err(|e| anyhow!("{e}"))
        .and_then(|(stderr, stdout)| {
            Daemonize::new()
                .stdout(stdout)
                .stderr(stderr)
                .start()
                .map_err(|e| anyhow!("{e}"))
        })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.clone())?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    // Fork before any runtime threads exist.
    if cli.daemonize {
        into_daemon()?;
    }
    init_log(cli.daemonize, config.level_filter()?)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build the async runtime")?;

    runtime.block_on(async move {
        #[cfg(feature = "tokio-console")]
        console_subscriber::init();

        info!("fridged {} starting", env!("CARGO_PKG_VERSION"));
        Application::builder().with_config(config).build()?.run().await
    })
}
