//! Logging System
//!
//! Structured logging through `tracing`. The `[logging]` config section sets the
//! baseline, `SFKIT_LOG*` environment variables override it and command-line
//! flags are applied last by the binary.
//!
//! Logs default to stderr so stdout carries only command output.

use crate::error::SfkitError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// `[logging]` section. Kept as plain strings so `config show` echoes what was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level or filter directive: trace, debug, info, warn, error, off
    pub level: String,
    /// text or json
    pub format: String,
    /// stdout, stderr, file or both (stderr and file)
    pub output: String,
    pub file: PathBuf,
    /// ANSI colors on terminal output
    pub color: bool,
    /// Per-module levels, e.g. `sfkit::org = "debug"`
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "text".to_string(),
            output: "stderr".to_string(),
            // The binary swaps this for $XDG_DATA_HOME/sfkit/sfkit.log.
            file: PathBuf::from(".sfkit/sfkit.log"),
            color: true,
            modules: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = SfkitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(SfkitError::ConfigError(format!(
                "Invalid log format: {} (must be 'json' or 'text')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
    Both,
}

impl LogOutput {
    fn writes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

impl FromStr for LogOutput {
    type Err = SfkitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            "both" => Ok(LogOutput::Both),
            other => Err(SfkitError::ConfigError(format!(
                "Invalid log output: {} (must be 'stdout', 'stderr', 'file', or 'both')",
                other
            ))),
        }
    }
}

impl LoggingConfig {
    /// Layer `SFKIT_LOG`, `SFKIT_LOG_FORMAT`, `SFKIT_LOG_OUTPUT` and
    /// `SFKIT_LOG_MODULES` over the configured values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(level) = var("SFKIT_LOG").filter(|v| !v.trim().is_empty()) {
            self.level = level;
        }
        if let Some(format) = var("SFKIT_LOG_FORMAT") {
            self.format = format;
        }
        if let Some(output) = var("SFKIT_LOG_OUTPUT") {
            self.output = output;
        }
        if let Some(modules) = var("SFKIT_LOG_MODULES") {
            for pair in modules.split(',') {
                if let Some((module, level)) = pair.split_once('=') {
                    self.modules
                        .insert(module.trim().to_string(), level.trim().to_string());
                }
            }
        }
        self
    }

    pub fn log_format(&self) -> Result<LogFormat, SfkitError> {
        self.format.parse()
    }

    pub fn log_output(&self) -> Result<LogOutput, SfkitError> {
        self.output.parse()
    }

    fn filter(&self) -> Result<EnvFilter, SfkitError> {
        if self.level == "off" {
            return Ok(EnvFilter::new("off"));
        }
        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| SfkitError::ConfigError(format!("Invalid log level '{}': {}", self.level, e)))?;
        for (module, level) in &self.modules {
            let directive = format!("{}={}", module, level)
                .parse()
                .map_err(|e| SfkitError::ConfigError(format!("Invalid log directive: {}", e)))?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }

    fn open_file(&self) -> Result<Arc<File>, SfkitError> {
        if let Some(parent) = self.file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SfkitError::ConfigError(format!("Failed to create log directory: {}", e))
            })?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)
            .map(Arc::new)
            .map_err(|e| {
                SfkitError::ConfigError(format!(
                    "Failed to open log file {}: {}",
                    self.file.display(),
                    e
                ))
            })
    }

    fn writer(&self, output: LogOutput) -> Result<BoxMakeWriter, SfkitError> {
        Ok(match output {
            LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogOutput::File => BoxMakeWriter::new(self.open_file()?),
            LogOutput::Both => BoxMakeWriter::new(std::io::stderr.and(self.open_file()?)),
        })
    }
}

/// Install the global subscriber. Callers apply env and flag overrides first.
pub fn init_logging(config: &LoggingConfig) -> Result<(), SfkitError> {
    let format = config.log_format()?;
    let output = config.log_output()?;
    let filter = config.filter()?;
    let writer = config.writer(output)?;
    let registry = Registry::default().with(filter);

    let result = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(config.color && !output.writes_file())
                    .with_writer(writer),
            )
            .try_init(),
    };

    result.map_err(|e| SfkitError::ConfigError(format!("Failed to initialize logging: {}", e)))
}
