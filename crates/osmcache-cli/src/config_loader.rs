//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use osmcache_core::config::{CliConfigOverrides, LayeredConfig, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

/// Config file for a project: the explicit path, or `osmcache.toml` when present
pub fn config_path(project_dir: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = project_dir.join(CONFIG_FILE_NAME);
            default.is_file().then_some(default)
        }
    }
}

/// Load layered configuration for a project
pub fn load_project_config(project_dir: &Path, explicit: Option<&Path>) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();

    if let Some(path) = config_path(project_dir, explicit) {
        config = config
            .load_from_file(&path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
    }

    Ok(config.load_from_env())
}

/// Load layered configuration with CLI overrides
pub fn load_project_config_with_overrides(
    project_dir: &Path,
    explicit: Option<&Path>,
    overrides: CliConfigOverrides,
) -> Result<LayeredConfig> {
    let mut config = load_project_config(project_dir, explicit)?;
    config.update_from_cli(overrides);
    Ok(config)
}
