use clap::Subcommand;

use super::config::ConfigArgs;
use super::show::{ShowArgs, SnapshotArgs};
use super::watch::WatchArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Poll the backend and print trail, gap and metrics changes until Ctrl-C
    Watch(WatchArgs),

    /// Run one trail poll and one metrics poll
    Poll,

    /// Trigger a regulatory scan, then refresh both pipelines
    Scan,

    /// Render the cached session without contacting the backend
    Show(ShowArgs),

    /// Write the cached session to a JSON file for diagnostics
    Snapshot(SnapshotArgs),

    /// Probe the backend health endpoint
    Health,

    /// Inspect the resolved configuration
    Config(ConfigArgs),
}
