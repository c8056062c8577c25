//! Configuration loading.
//!
//! Reads `.gait/config.toml` for a workspace. A missing or empty file yields
//! the defaults; a present file must parse and validate.

use gait_core::config::GaitConfig;
use gait_core::error::{GaitError, Result};

use crate::paths::GaitPaths;
use crate::storage::atomic_file::AtomicFile;

/// Loads and validates the workspace configuration.
///
/// # Errors
///
/// Returns [`GaitError::Config`] for unparsable TOML or invalid values.
pub async fn load_config(paths: &GaitPaths) -> Result<GaitConfig> {
    let file = AtomicFile::new(paths.config_file());
    let Some(bytes) = file.load().await? else {
        tracing::debug!("No config at {}, using defaults", paths.config_file().display());
        return Ok(GaitConfig::default());
    };
    let text = String::from_utf8(bytes)
        .map_err(|e| GaitError::config(format!("config.toml is not UTF-8: {}", e)))?;
    if text.trim().is_empty() {
        return Ok(GaitConfig::default());
    }

    let config: GaitConfig = toml::from_str(&text)
        .map_err(|e| GaitError::config(format!("Failed to parse {}: {}", paths.config_file().display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Writes `config` to `.gait/config.toml`, replacing any existing file.
pub async fn save_config(paths: &GaitPaths, config: &GaitConfig) -> Result<()> {
    config.validate()?;
    let text = toml::to_string_pretty(config)?;
    AtomicFile::new(paths.config_file())
        .save(text.as_bytes())
        .await
}

/// Loads the configuration and returns paths pointing at its state file.
pub async fn load_workspace(paths: GaitPaths) -> Result<(GaitPaths, GaitConfig)> {
    let config = load_config(&paths).await?;
    let paths = paths.with_state_file(config.state_file.clone());
    Ok((paths, config))
}
