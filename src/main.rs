//! ircb - single-connection IRC bot.

mod cli;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ircb::config::{Config, validate};
use ircb::{Connection, ExitReason};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

const DEFAULT_CONFIG: &str = "config.toml";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let (mut config, loaded_from) = load_config(&cli)?;
    cli.apply(&mut config);

    init_tracing(config.features.verbose, cli.log_json);
    match &loaded_from {
        Some(path) => info!(path = %path, "config loaded"),
        None => info!("no config file, using defaults"),
    }

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "configuration has {} error(s), see above",
            errors.len()
        ));
    }

    info!(
        version = ircb::VERSION,
        host = %config.server.host,
        nick = %config.bot.nick,
        master = %config.bot.master_nick(),
        "starting"
    );

    let store = ircb::store::open(&config.database)?;
    let conn = Connection::new(config, store)?;

    let signal_conn = Arc::clone(&conn);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            if let Err(e) = signal_conn.close(ExitReason::Stop).await {
                warn!(error = %e, "close on interrupt failed");
            }
        }
    });

    match conn.connect().await {
        Ok(reason) => {
            info!(reason = ?reason, "exiting");
            Ok(ExitCode::from(reason.exit_code()))
        }
        Err(e) => {
            error!(error = %e, code = e.error_code(), "connection failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// An explicit path must load; the default path may be absent.
fn load_config(cli: &Cli) -> anyhow::Result<(Config, Option<String>)> {
    match &cli.config {
        Some(path) => {
            let config = Config::load(path)
                .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
            Ok((config, Some(path.display().to_string())))
        }
        None if Path::new(DEFAULT_CONFIG).exists() => {
            let config = Config::load(DEFAULT_CONFIG)
                .map_err(|e| anyhow::anyhow!("{DEFAULT_CONFIG}: {e}"))?;
            Ok((config, Some(DEFAULT_CONFIG.to_string())))
        }
        None => Ok((Config::default(), None)),
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
