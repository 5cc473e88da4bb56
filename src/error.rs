//! Error types for sfkit.

use std::path::PathBuf;
use thiserror::Error;

/// Broad error categories used when reporting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Workspace, project or org setup is missing; nothing was sent to the org.
    Environment,
    /// The Salesforce CLI or the REST API rejected a call.
    Org,
    /// A local metadata file could not be found, read, or rewritten.
    Metadata,
    /// Bad arguments or an aborted prompt.
    Input,
    /// Configuration, storage and I/O failures.
    Internal,
}

#[derive(Debug, Error)]
pub enum SfkitError {
    #[error("Workspace not found: {0}")]
    NoWorkspace(PathBuf),

    #[error("Not a Salesforce DX project: no sfdx-project.json in {0}")]
    NotAProject(PathBuf),

    #[error("No default org is set. Run `sf config set target-org <alias>` or pass --target-org")]
    NoDefaultOrg,

    #[error("`sf {command}` failed: {message}")]
    CliFailed { command: String, message: String },

    #[error("Unreadable output from `sf {command}`: {detail}")]
    CliOutput { command: String, detail: String },

    #[error("REST request failed: {0}")]
    Rest(String),

    #[error("REST request rejected with status {status}: {message}")]
    RestRejected { status: u16, message: String },

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("No metadata file found for {0}")]
    TargetNotFound(String),

    #[error("Unknown permission target: {0}")]
    UnknownTarget(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("{failed} of {total} targets failed\n{report}")]
    PartialFailure {
        failed: usize,
        total: usize,
        report: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SfkitError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SfkitError::NoWorkspace(_) | SfkitError::NotAProject(_) | SfkitError::NoDefaultOrg => {
                ErrorCategory::Environment
            }
            SfkitError::CliFailed { .. }
            | SfkitError::CliOutput { .. }
            | SfkitError::Rest(_)
            | SfkitError::RestRejected { .. }
            | SfkitError::PartialFailure { .. } => ErrorCategory::Org,
            SfkitError::Metadata(_) | SfkitError::TargetNotFound(_) => ErrorCategory::Metadata,
            SfkitError::UnknownTarget(_) | SfkitError::InvalidInput(_) | SfkitError::Prompt(_) => {
                ErrorCategory::Input
            }
            SfkitError::ConfigError(_)
            | SfkitError::Storage(_)
            | SfkitError::Serialization(_)
            | SfkitError::Io(_) => ErrorCategory::Internal,
        }
    }

    pub fn cli_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        SfkitError::CliFailed {
            command: command.into(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for SfkitError {
    fn from(err: config::ConfigError) -> Self {
        SfkitError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for SfkitError {
    fn from(err: serde_json::Error) -> Self {
        SfkitError::Serialization(err.to_string())
    }
}

impl From<quick_xml::Error> for SfkitError {
    fn from(err: quick_xml::Error) -> Self {
        SfkitError::Metadata(err.to_string())
    }
}

impl From<sled::Error> for SfkitError {
    fn from(err: sled::Error) -> Self {
        SfkitError::Storage(err.to_string())
    }
}

impl From<dialoguer::Error> for SfkitError {
    fn from(err: dialoguer::Error) -> Self {
        SfkitError::Prompt(err.to_string())
    }
}

impl From<reqwest::Error> for SfkitError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            SfkitError::RestRejected {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_timeout() {
            SfkitError::Rest(format!("Request timeout: {}", err))
        } else if err.is_connect() {
            SfkitError::Rest(format!("Connection error: {}", err))
        } else {
            SfkitError::Rest(format!("HTTP error: {}", err))
        }
    }
}
