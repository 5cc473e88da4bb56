//! Configuration System
//!
//! Layered configuration for sfkit: built-in defaults, the global config file,
//! workspace files under `.sfkit/`, then `SFKIT__*` environment variables. A
//! `--config <file>` argument replaces file discovery. Tests included.

use crate::error::SfkitError;
use crate::logging::LoggingConfig;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod facade;
mod merge;
pub mod paths;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SfkitConfig {
    /// Background refresh of cached org identifiers
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Follow-up actions after local metadata changes
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Salesforce CLI invocation
    #[serde(default)]
    pub cli: CliConfig,

    /// Org overrides
    #[serde(default)]
    pub org: OrgConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Minutes between refreshes in `watch` mode; 0 disables the timer.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

fn default_interval_minutes() -> u64 {
    30
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_minutes > 0).then(|| Duration::from_secs(self.interval_minutes * 60))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Retrieve a permission set's source after creating it in the org.
    #[serde(default = "default_true")]
    pub retrieve_after_create: bool,

    /// Retrieve a target's source again after a permission edit was deployed.
    #[serde(default)]
    pub retrieve_after_edit: bool,

    /// Deploy edited metadata files right away.
    #[serde(default = "default_true")]
    pub deploy_after_edit: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            retrieve_after_create: true,
            retrieve_after_edit: false,
            deploy_after_edit: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Salesforce CLI executable
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Per-invocation timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_binary() -> String {
    "sf".to_string()
}

fn default_timeout_seconds() -> u64 {
    600
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl CliConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgConfig {
    /// REST API version override, e.g. "61.0"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Org alias or username used instead of the CLI default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_org: Option<String>,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Refresh(String),
    Cli(String),
    Org(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Refresh(msg) => write!(f, "refresh: {}", msg),
            ValidationError::Cli(msg) => write!(f, "cli: {}", msg),
            ValidationError::Org(msg) => write!(f, "org: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

const MAX_INTERVAL_MINUTES: u64 = 24 * 60;

impl SfkitConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.refresh.interval_minutes > MAX_INTERVAL_MINUTES {
            errors.push(ValidationError::Refresh(format!(
                "interval_minutes must be at most {} (got {})",
                MAX_INTERVAL_MINUTES, self.refresh.interval_minutes
            )));
        }

        if self.cli.binary.trim().is_empty() {
            errors.push(ValidationError::Cli("binary cannot be empty".to_string()));
        }
        if self.cli.timeout_seconds == 0 {
            errors.push(ValidationError::Cli(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if let Some(version) = &self.org.api_version {
            if !is_api_version(version) {
                errors.push(ValidationError::Org(format!(
                    "api_version '{}' is not of the form NN.0",
                    version
                )));
            }
        }
        if matches!(&self.org.target_org, Some(org) if org.trim().is_empty()) {
            errors.push(ValidationError::Org("target_org cannot be empty".to_string()));
        }

        if self.logging.log_format().is_err() {
            errors.push(ValidationError::Logging(format!(
                "format '{}' must be 'json' or 'text'",
                self.logging.format
            )));
        }
        if self.logging.log_output().is_err() {
            errors.push(ValidationError::Logging(format!(
                "output '{}' must be 'stdout', 'stderr', 'file' or 'both'",
                self.logging.output
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and convert failures into a single error.
    pub fn validated(self) -> Result<Self, SfkitError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            SfkitError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(self)
    }

    pub fn to_toml(&self) -> Result<String, SfkitError> {
        toml::to_string_pretty(self).map_err(|e| SfkitError::Serialization(e.to_string()))
    }
}

fn is_api_version(version: &str) -> bool {
    let version = version.trim_start_matches('v');
    match version.split_once('.') {
        Some((major, minor)) => {
            !major.is_empty()
                && !minor.is_empty()
                && major.chars().all(|c| c.is_ascii_digit())
                && minor.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Shared configuration that `watch` reloads when config files change.
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<SfkitConfig>>,
    workspace_root: PathBuf,
    override_file: Option<PathBuf>,
}

impl ConfigManager {
    pub fn new(config: SfkitConfig, workspace_root: PathBuf, override_file: Option<PathBuf>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            workspace_root,
            override_file,
        }
    }

    /// Reload configuration from files. The current config is kept when the new one is invalid.
    pub fn reload(&self) -> Result<SfkitConfig, SfkitError> {
        let new_config = ConfigLoader::load_with_override(&self.workspace_root, self.override_file.as_deref())
            .map_err(|e| SfkitError::ConfigError(format!("Failed to load config: {}", e)))?
            .validated()?;

        *self.config.write() = new_config.clone();
        Ok(new_config)
    }

    /// Get current configuration (read-only)
    pub fn get(&self) -> SfkitConfig {
        self.config.read().clone()
    }

    /// Files whose changes should trigger a reload.
    pub fn watched_files(&self) -> Vec<PathBuf> {
        ConfigLoader::config_files(&self.workspace_root, self.override_file.as_deref())
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}
