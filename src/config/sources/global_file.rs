//! Global config file source: $XDG_CONFIG_HOME/sfkit/config.toml

use crate::config::paths;
use config::builder::DefaultState;
use config::{ConfigBuilder, File, FileFormat};
use tracing::debug;

/// Add the global config file to the builder if it exists.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    match paths::global_config_path() {
        Some(path) if path.is_file() => {
            let path = dunce::canonicalize(&path).unwrap_or(path);
            debug!(config_path = %path.display(), "Loading global configuration");
            builder.add_source(File::from(path.as_path()).format(FileFormat::Toml).required(false))
        }
        Some(path) => {
            debug!(config_path = %path.display(), "No global configuration file");
            builder
        }
        None => builder,
    }
}
