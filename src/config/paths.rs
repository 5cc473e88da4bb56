//! XDG locations for sfkit's global config and per-workspace data.

use crate::error::SfkitError;
use directories::BaseDirs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "sfkit";

/// `$XDG_CONFIG_HOME`, falling back to the platform config directory.
pub fn config_home() -> Option<PathBuf> {
    env_dir("XDG_CONFIG_HOME").or_else(|| BaseDirs::new().map(|d| d.config_dir().to_path_buf()))
}

/// `$XDG_DATA_HOME`, falling back to the platform data directory.
pub fn data_home() -> Option<PathBuf> {
    env_dir("XDG_DATA_HOME").or_else(|| BaseDirs::new().map(|d| d.data_dir().to_path_buf()))
}

/// `<config home>/sfkit/config.toml`
pub fn global_config_path() -> Option<PathBuf> {
    config_home().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

/// `<data home>/sfkit`
pub fn data_dir() -> Result<PathBuf, SfkitError> {
    data_home()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| SfkitError::ConfigError("Cannot determine a data directory".to_string()))
}

/// `<data home>/sfkit/workspaces/<blake3 of canonical workspace path>`
pub fn workspace_data_dir(workspace_root: &Path) -> Result<PathBuf, SfkitError> {
    let canonical = dunce::canonicalize(workspace_root).unwrap_or_else(|_| workspace_root.to_path_buf());
    let digest = blake3::hash(canonical.to_string_lossy().as_bytes());
    Ok(data_dir()?
        .join("workspaces")
        .join(hex::encode(digest.as_bytes())))
}

/// Directory holding workspace-level config files.
pub fn workspace_config_dir(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".sfkit")
}

fn env_dir(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
}
