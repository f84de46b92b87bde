use std::io;

use anyhow::{Context, Result};
use compliance_watch::AppConfig;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::env::CliArgs;

/// Logs go to stderr so `--output json` stays machine-readable.
pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    Ok(())
}

/// Command-line flags win over the config file and the environment.
pub fn apply_cli_overrides(config: &mut AppConfig, cli: &CliArgs) {
    if let Some(dir) = &cli.state_dir {
        debug!(state_dir = %dir.display(), "state directory set on command line");
        config.state_dir = dir.clone();
    }
    if let Some(api_base) = &cli.api_base {
        debug!(%api_base, "api base set on command line");
        config.api_base = api_base.clone();
    }
}
