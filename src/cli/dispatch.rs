use super::config::cmd_config;
use super::health::cmd_health;
use super::poll::{cmd_poll, cmd_scan};
use super::show::{cmd_show, cmd_snapshot};
use super::watch::cmd_watch;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use crate::cli::env::CliArgs;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Watch(args) => cmd_watch(args, ctx).await,
        Commands::Poll => cmd_poll(ctx).await,
        Commands::Scan => cmd_scan(ctx).await,
        Commands::Show(args) => cmd_show(args, ctx),
        Commands::Snapshot(args) => cmd_snapshot(args, ctx),
        Commands::Health => cmd_health(ctx).await,
        Commands::Config(args) => cmd_config(args, ctx),
    }
}
