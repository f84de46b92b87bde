use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{apply_cli_overrides, init_logging};
use compliance_watch::{load_config, LoadedConfig};

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug)?;

    info!("Starting compliance-watch v{}", env!("CARGO_PKG_VERSION"));

    let LoadedConfig {
        mut config,
        path,
        from_file,
    } = load_config(cli.config.as_deref()).await?;
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;
    let cli_context = CliContext::new(config, path, from_file, cli.ephemeral, cli.output);

    match dispatch(&cli, &cli_context).await {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
