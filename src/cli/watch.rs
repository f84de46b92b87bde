use std::sync::Arc;
use std::time::Duration;

use activity_trail::adapters::PipelineEvent;
use anyhow::{Context, Result};
use clap::Args;
use compliance_core_types::{DashboardMetrics, GapRecord, NormalizedEntry, PipelineKind};
use compliance_state_center::{SessionState, RECENT_ACTIVITY_LIMIT};
use compliance_watch::App;
use serde_json::json;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::context::CliContext;
use super::output::{render_entry, render_gap, render_metrics, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct WatchArgs {
    /// Activity trail poll interval (e.g. 3s, 500ms)
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub trail_interval: Option<Duration>,

    /// Dashboard metrics poll interval
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub metrics_interval: Option<Duration>,
}

/// Last rendered view; events only print when it changes.
struct Rendered {
    trail: Arc<Vec<NormalizedEntry>>,
    gaps: Vec<GapRecord>,
    metrics: Option<DashboardMetrics>,
}

/// What a trail update adds to the screen.
#[derive(Debug)]
struct TrailView {
    entries: usize,
    recent: Vec<NormalizedEntry>,
    new_gaps: Vec<GapRecord>,
}

impl Rendered {
    fn from_state(state: &SessionState) -> Self {
        Self {
            trail: state.trail(),
            gaps: state.recent_gaps(),
            metrics: state.metrics(),
        }
    }

    /// The backend resends its whole history, so the same finding is
    /// re-classified every poll. Only gaps absent from the last render count.
    fn trail_view(&mut self, state: &SessionState) -> Option<TrailView> {
        let trail = state.trail();
        let gaps = state.recent_gaps();
        let mut new_gaps: Vec<GapRecord> = Vec::new();
        for gap in &gaps {
            if !self.gaps.contains(gap) && !new_gaps.contains(gap) {
                new_gaps.push(gap.clone());
            }
        }
        let trail_changed = *trail != *self.trail;
        self.gaps = gaps;
        if !trail_changed && new_gaps.is_empty() {
            return None;
        }
        self.trail = Arc::clone(&trail);
        Some(TrailView {
            entries: trail.len(),
            recent: state.recent_activity(RECENT_ACTIVITY_LIMIT),
            new_gaps,
        })
    }

    fn metrics_changed(&mut self, metrics: &DashboardMetrics) -> bool {
        if self.metrics.as_ref() == Some(metrics) {
            return false;
        }
        self.metrics = Some(metrics.clone());
        true
    }
}

pub async fn cmd_watch(args: WatchArgs, ctx: &CliContext) -> Result<()> {
    let mut config = ctx.config().clone();
    if let Some(interval) = args.trail_interval {
        config.trail_interval = interval;
    }
    if let Some(interval) = args.metrics_interval {
        config.metrics_interval = interval;
    }
    let app = App::build(config, ctx.ephemeral())?;
    let output = ctx.output();

    let restored = app.rehydrated();
    if !output.is_json() {
        println!(
            "Watching {} (trail every {}, metrics every {}); restored {} entries and {} gaps. Ctrl-C to stop.",
            app.config().api_base,
            humantime::format_duration(app.config().trail_interval),
            humantime::format_duration(app.config().metrics_interval),
            restored.trail_entries,
            restored.gaps
        );
    }

    let mut events = app.subscribe();
    let handle = app.poller().spawn();
    let mut rendered = Rendered::from_state(app.state());

    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            res = &mut shutdown => {
                res.context("listening for Ctrl-C")?;
                info!("interrupt received; stopping watch");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => render_event(&event, app.state(), &mut rendered, output)?,
                Err(RecvError::Lagged(missed)) => warn!(missed, "watch output fell behind pipeline events"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    handle.shutdown().await?;
    if !output.is_json() {
        let stats = app.state().stats();
        for (kind, totals) in [
            (PipelineKind::Trail, &stats.trail),
            (PipelineKind::Metrics, &stats.metrics),
        ] {
            println!(
                "{kind}: {} ok, {} failed, {} skipped, {} discarded",
                totals.succeeded, totals.failed, totals.skipped, totals.discarded
            );
        }
        if stats.storage_failures > 0 {
            println!("storage failures: {}", stats.storage_failures);
        }
    }
    Ok(())
}

fn render_event(
    event: &PipelineEvent,
    state: &SessionState,
    rendered: &mut Rendered,
    output: OutputFormat,
) -> Result<()> {
    match event {
        PipelineEvent::TrailUpdated { .. } => {
            let view = match rendered.trail_view(state) {
                Some(view) => view,
                None => return Ok(()),
            };
            if output.is_json() {
                println!(
                    "{}",
                    serde_json::to_string(&json!({
                        "event": "trail_updated",
                        "entries": view.entries,
                        "recent_activity": view.recent,
                        "new_gaps": view.new_gaps,
                    }))?
                );
                return Ok(());
            }
            println!("-- trail: {} entries", view.entries);
            for entry in &view.recent {
                println!("  {}", render_entry(entry));
            }
            for gap in &view.new_gaps {
                println!("  GAP {}", render_gap(gap));
            }
        }
        PipelineEvent::MetricsUpdated { metrics } => {
            if !rendered.metrics_changed(metrics) {
                return Ok(());
            }
            if output.is_json() {
                println!(
                    "{}",
                    serde_json::to_string(&json!({
                        "event": "metrics_updated",
                        "metrics": metrics,
                    }))?
                );
                return Ok(());
            }
            println!("-- metrics");
            println!("{}", render_metrics(metrics));
        }
        // Failures are already reported through the log.
        _ => {}
    }
    Ok(())
}
