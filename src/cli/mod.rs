pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod health;
pub mod output;
pub mod poll;
pub mod runtime;
pub mod show;
pub mod watch;
