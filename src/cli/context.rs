use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use compliance_state_center::{RehydrateReport, SessionState};
use compliance_watch::{open_session, App, AppConfig};

use super::output::OutputFormat;

pub struct CliContext {
    config: AppConfig,
    config_path: PathBuf,
    from_file: bool,
    ephemeral: bool,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(
        config: AppConfig,
        config_path: PathBuf,
        from_file: bool,
        ephemeral: bool,
        output: OutputFormat,
    ) -> Self {
        Self {
            config,
            config_path,
            from_file,
            ephemeral,
            output,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn from_file(&self) -> bool {
        self.from_file
    }

    pub fn ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    /// Session wired to the backend; used by every networked command.
    pub fn build_app(&self) -> Result<App> {
        App::build(self.config.clone(), self.ephemeral)
    }

    /// Cached session only; never contacts the backend.
    pub fn open_cache(&self) -> (Arc<SessionState>, RehydrateReport) {
        open_session(&self.config, self.ephemeral)
    }
}
