//! Startup helpers for the plsync binary

pub mod config;

pub use config::{find_config_path, load_config};
