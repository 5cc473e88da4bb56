//! Workspace config file source: .sfkit/config.toml and .sfkit/{env}.toml

use crate::config::paths;
use config::builder::DefaultState;
use config::{ConfigBuilder, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Add workspace config files to builder.
/// Precedence: .sfkit/config.toml (base) then .sfkit/{SFKIT_ENV}.toml when SFKIT_ENV is set.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> ConfigBuilder<DefaultState> {
    let config_dir = paths::workspace_config_dir(workspace_root);
    let mut builder = builder;

    let base_config_path = config_dir.join("config.toml");
    if base_config_path.is_file() {
        debug!(config_path = %base_config_path.display(), "Loading workspace configuration");
        builder = builder.add_source(
            File::from(base_config_path.as_path())
                .format(FileFormat::Toml)
                .required(false),
        );
    }

    if let Ok(env_name) = std::env::var("SFKIT_ENV") {
        let env_config_path = config_dir.join(format!("{}.toml", env_name));
        if env_config_path.is_file() {
            builder = builder.add_source(
                File::from(env_config_path.as_path())
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }
    }

    builder
}
