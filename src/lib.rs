//! compliance-watch library
//!
//! Configuration and session wiring shared by the CLI and integration tests.

pub mod app;
pub mod config;

pub use app::{open_session, App};
pub use config::{load_config, AppConfig, LoadedConfig};
