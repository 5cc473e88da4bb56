//! Merge rules: defaults, override order, conflict handling.
//!
//! Later sources override earlier ones key by key: defaults, global file,
//! workspace file, workspace env file, then `SFKIT__*` environment variables.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment};

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("refresh.interval_minutes", 30)?
        .set_default("metadata.retrieve_after_create", true)?
        .set_default("metadata.retrieve_after_edit", false)?
        .set_default("metadata.deploy_after_edit", true)?
        .set_default("cli.binary", "sf")?
        .set_default("cli.timeout_seconds", 600)
}

/// Environment overrides, e.g. `SFKIT__REFRESH__INTERVAL_MINUTES=5`.
pub fn environment_source() -> Environment {
    Environment::with_prefix("SFKIT")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
