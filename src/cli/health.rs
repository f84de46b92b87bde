use activity_trail::ActivityPipeline;
use anyhow::{bail, Context, Result};
use serde_json::json;

use super::context::CliContext;
use super::output::print_json;

pub async fn cmd_health(ctx: &CliContext) -> Result<()> {
    let app = ctx.build_app()?;
    let api_base = &app.config().api_base;
    let health = app
        .pipeline()
        .health()
        .await
        .with_context(|| format!("probing {api_base}"))?;

    if ctx.output().is_json() {
        print_json(&json!({
            "api_base": api_base,
            "status": health.status,
            "healthy": health.is_healthy(),
        }))?;
    } else {
        println!("{api_base}: {}", health.status);
    }

    if !health.is_healthy() {
        bail!("backend reported status {:?}", health.status);
    }
    Ok(())
}
