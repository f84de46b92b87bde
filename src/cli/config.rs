use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::context::CliContext;
use crate::cli::output::print_json;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the resolved configuration (file, environment and flags applied)
    Show,
}

pub fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            if ctx.output().is_json() {
                return print_json(ctx.config());
            }
            let source = if ctx.from_file() {
                ctx.config_path().display().to_string()
            } else {
                format!("defaults; no file at {}", ctx.config_path().display())
            };
            println!("Current configuration ({source}):");
            print!("{}", serde_yaml::to_string(ctx.config())?);
        }
    }

    Ok(())
}
