use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::json;

use super::context::CliContext;
use super::output::{print_json, render_entry, render_gap, render_metrics};

#[derive(Args, Clone, Debug)]
pub struct ShowArgs {
    #[command(subcommand)]
    pub target: ShowTarget,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ShowTarget {
    /// Audit trail, newest first
    Trail {
        /// Only print the newest N entries
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Case-insensitive filter on agent, action and client
        #[arg(long, value_name = "QUERY")]
        search: Option<String>,
    },

    /// Recent compliance gaps, oldest first
    Gaps,

    /// Cached dashboard metrics
    Metrics,

    /// Cache contents and session counters
    Stats,
}

#[derive(Args, Clone, Debug)]
pub struct SnapshotArgs {
    /// Destination file
    #[arg(value_name = "FILE")]
    pub path: PathBuf,
}

pub fn cmd_show(args: ShowArgs, ctx: &CliContext) -> Result<()> {
    let (state, cached) = ctx.open_cache();
    let json_output = ctx.output().is_json();

    match args.target {
        ShowTarget::Trail { limit, search } => {
            let mut entries = match search.as_deref() {
                Some(query) => state.search_trail(query),
                None => state.trail().as_ref().clone(),
            };
            if let Some(limit) = limit {
                entries.truncate(limit);
            }
            if json_output {
                return print_json(&entries);
            }
            if entries.is_empty() {
                println!("No activity recorded yet");
            }
            for entry in &entries {
                println!("{}", render_entry(entry));
            }
        }
        ShowTarget::Gaps => {
            let gaps = state.recent_gaps();
            if json_output {
                return print_json(&gaps);
            }
            println!("Recent gaps ({}/{}):", gaps.len(), state.gap_capacity());
            for gap in &gaps {
                println!("  {}", render_gap(gap));
            }
        }
        ShowTarget::Metrics => {
            let metrics = state.metrics();
            if json_output {
                return print_json(&json!({
                    "metrics": metrics,
                    "report_score": state.report_score(),
                }));
            }
            match metrics {
                Some(metrics) => println!("{}", render_metrics(&metrics)),
                None => println!(
                    "No metrics cached yet (report score {})",
                    state.report_score()
                ),
            }
        }
        ShowTarget::Stats => {
            let stats = state.stats();
            if json_output {
                return print_json(&json!({
                    "state_dir": ctx.config().state_dir,
                    "ephemeral": ctx.ephemeral(),
                    "cached_trail_entries": cached.trail_entries,
                    "cached_gaps": cached.gaps,
                    "cached_metrics": cached.metrics,
                    "gap_capacity": state.gap_capacity(),
                    "stats": stats,
                }));
            }
            println!("State directory: {}", ctx.config().state_dir.display());
            if ctx.ephemeral() {
                println!("(ephemeral session: nothing read from disk)");
            }
            println!("Cached trail entries: {}", cached.trail_entries);
            println!("Cached gaps: {}/{}", cached.gaps, state.gap_capacity());
            println!("Cached metrics: {}", if cached.metrics { "yes" } else { "no" });
            println!("Storage failures: {}", stats.storage_failures);
        }
    }

    Ok(())
}

pub fn cmd_snapshot(args: SnapshotArgs, ctx: &CliContext) -> Result<()> {
    let (state, _) = ctx.open_cache();
    state
        .write_snapshot(&args.path)
        .with_context(|| format!("writing snapshot to {}", args.path.display()))?;
    if ctx.output().is_json() {
        print_json(&json!({ "snapshot": args.path }))
    } else {
        println!("Snapshot written to {}", args.path.display());
        Ok(())
    }
}
