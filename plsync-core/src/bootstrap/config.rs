//! Configuration loading

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::Config;

const SEARCH_PATHS: [&str; 2] = ["config.yaml", "/config/config.yaml"];

/// Pick the config file to read.
///
/// An explicit path (from `--config` or `PLSYNC_CONFIG_PATH`) wins. Otherwise
/// `./config.yaml` then `/config/config.yaml` are tried. `None` means
/// environment variables only.
pub fn find_config_path(explicit: Option<&str>) -> Result<Option<String>> {
    if let Some(path) = explicit {
        if !Path::new(path).exists() {
            anyhow::bail!("Config file {path} does not exist");
        }
        return Ok(Some(path.to_string()));
    }

    Ok(SEARCH_PATHS
        .iter()
        .find(|path| Path::new(path).exists())
        .map(|path| (*path).to_string()))
}

/// Load and validate configuration. Any validation problem is fatal.
pub fn load_config(explicit: Option<&str>) -> Result<Config> {
    // Logging is not initialised yet, so report progress on stderr
    let config = match find_config_path(explicit)? {
        Some(path) => {
            eprintln!("Loading config from {path}");
            Config::from_file(&path).with_context(|| format!("Failed to load {path}"))?
        }
        None => {
            eprintln!("No config file found, using environment variables");
            Config::from_env().context("Failed to load config from environment")?
        }
    };

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Config validation error: {error}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    info!("Configuration loaded and validated successfully");
    Ok(config)
}
