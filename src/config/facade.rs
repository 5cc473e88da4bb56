//! Config loading entry points.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::{paths, SfkitConfig};
use config::{ConfigError, File, FileFormat};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace with file discovery.
    pub fn load(workspace_root: &Path) -> Result<SfkitConfig, ConfigError> {
        Self::load_with_override(workspace_root, None)
    }

    /// Load configuration; an override file replaces global and workspace discovery.
    pub fn load_with_override(
        workspace_root: &Path,
        override_file: Option<&Path>,
    ) -> Result<SfkitConfig, ConfigError> {
        let mut builder = merge_policy::builder_with_defaults()?;

        match override_file {
            Some(path) => {
                builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
            }
            None => {
                builder = global_file::add_to_builder(builder);
                builder = workspace_file::add_to_builder(builder, workspace_root);
            }
        }

        builder
            .add_source(merge_policy::environment_source())
            .build()?
            .try_deserialize()
    }

    /// Load a single file over the defaults, ignoring discovery and environment.
    pub fn load_from_file(path: &Path) -> Result<SfkitConfig, ConfigError> {
        merge_policy::builder_with_defaults()?
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .build()?
            .try_deserialize()
    }

    /// Global config file location, if one can be determined.
    pub fn xdg_config_path() -> Option<PathBuf> {
        paths::global_config_path()
    }

    /// Files that contribute to the configuration (existing or not).
    pub fn config_files(workspace_root: &Path, override_file: Option<&Path>) -> Vec<PathBuf> {
        if let Some(path) = override_file {
            return vec![path.to_path_buf()];
        }
        let mut files = Vec::new();
        if let Some(global) = paths::global_config_path() {
            files.push(global);
        }
        let workspace_dir = paths::workspace_config_dir(workspace_root);
        files.push(workspace_dir.join("config.toml"));
        if let Ok(env_name) = std::env::var("SFKIT_ENV") {
            files.push(workspace_dir.join(format!("{}.toml", env_name)));
        }
        files
    }
}
