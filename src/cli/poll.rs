use anyhow::{bail, Context, Result};
use compliance_core_types::PipelineKind;
use compliance_poller::PollOutcome;
use compliance_state_center::RECENT_ACTIVITY_LIMIT;
use compliance_watch::App;
use serde_json::{json, Value as JsonValue};

use super::context::CliContext;
use super::output::{
    describe_outcome, outcome_json, print_json, render_entry, render_gap, render_metrics,
};

pub async fn cmd_poll(ctx: &CliContext) -> Result<()> {
    let app = ctx.build_app()?;
    let poller = app.poller();
    let trail = poller.poll_now(PipelineKind::Trail).await;
    let metrics = poller.poll_now(PipelineKind::Metrics).await;
    print_cycle(ctx, &app, &trail, &metrics, None)?;

    if matches!(trail, PollOutcome::Failed(_)) && matches!(metrics, PollOutcome::Failed(_)) {
        bail!(
            "dashboard backend at {} is unreachable; cached state left untouched",
            app.config().api_base
        );
    }
    Ok(())
}

pub async fn cmd_scan(ctx: &CliContext) -> Result<()> {
    let app = ctx.build_app()?;
    let settle = app.config().scan_settle;
    if !ctx.output().is_json() {
        println!(
            "Scan requested; refreshing in {}",
            humantime::format_duration(settle)
        );
    }
    let report = app
        .poller()
        .scan_and_refresh(settle)
        .await
        .context("regulatory scan failed")?;
    print_cycle(ctx, &app, &report.trail, &report.metrics, Some(&report.reply))
}

fn print_cycle(
    ctx: &CliContext,
    app: &App,
    trail: &PollOutcome,
    metrics: &PollOutcome,
    scan_reply: Option<&JsonValue>,
) -> Result<()> {
    let state = app.state();
    let recent = state.recent_activity(RECENT_ACTIVITY_LIMIT);
    let gaps = state.recent_gaps();

    if ctx.output().is_json() {
        let mut body = json!({
            "trail": outcome_json(trail),
            "metrics": outcome_json(metrics),
            "trail_entries": state.trail().len(),
            "recent_activity": recent,
            "recent_gaps": gaps,
            "dashboard": state.metrics(),
            "report_score": state.report_score(),
            "stats": state.stats(),
        });
        if let Some(reply) = scan_reply {
            body["scan_reply"] = reply.clone();
        }
        return print_json(&body);
    }

    println!("Trail poll:   {}", describe_outcome(trail));
    println!("Metrics poll: {}", describe_outcome(metrics));
    println!();
    match state.metrics() {
        Some(snapshot) => println!("{}", render_metrics(&snapshot)),
        None => println!(
            "No metrics cached yet (report score {})",
            state.report_score()
        ),
    }
    println!();
    println!(
        "Recent activity ({} of {}):",
        recent.len(),
        state.trail().len()
    );
    for entry in &recent {
        println!("  {}", render_entry(entry));
    }
    println!();
    println!("Recent gaps ({}/{}):", gaps.len(), state.gap_capacity());
    for gap in &gaps {
        println!("  {}", render_gap(gap));
    }
    Ok(())
}
