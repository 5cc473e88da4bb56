//! Salesforce CLI invocation and JSON envelope handling.
//!
//! Every call is one-shot with `--json`; there are no retries. The envelope is
//! decoded into [`CliOutcome`] so success and failure are explicit branches.

use crate::error::SfkitError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Raw result of one CLI process.
#[derive(Debug, Clone, Default)]
pub struct CliOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `sf` with the given arguments. `--json` is appended by the implementation.
#[async_trait]
pub trait SfCli: Send + Sync {
    async fn run(&self, args: &[String]) -> Result<CliOutput, SfkitError>;
}

/// Spawns the real CLI binary as a subprocess.
pub struct ProcessCli {
    binary: String,
    working_dir: PathBuf,
    timeout: Duration,
}

impl ProcessCli {
    pub fn new(binary: impl Into<String>, working_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            working_dir,
            timeout,
        }
    }
}

#[async_trait]
impl SfCli for ProcessCli {
    async fn run(&self, args: &[String]) -> Result<CliOutput, SfkitError> {
        let command_line = args.join(" ");
        debug!(binary = %self.binary, args = %command_line, "Running Salesforce CLI");

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .arg("--json")
            .current_dir(&self.working_dir)
            .env("SF_AUTOUPDATE_DISABLE", "true")
            .env("FORCE_COLOR", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                SfkitError::cli_failed(
                    command_line.clone(),
                    format!("timed out after {}s", self.timeout.as_secs()),
                )
            })?
            .map_err(|e| {
                SfkitError::cli_failed(
                    command_line.clone(),
                    format!("failed to launch `{}`: {}", self.binary, e),
                )
            })?;

        Ok(CliOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    warnings: Vec<Value>,
}

/// Decoded CLI envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum CliOutcome<T> {
    Success {
        result: T,
        warnings: Vec<String>,
    },
    Failure {
        status: i64,
        name: String,
        message: String,
    },
}

impl<T: DeserializeOwned> CliOutcome<T> {
    /// Decode an envelope from CLI output text.
    ///
    /// Leading non-JSON noise (update notices, warnings) before the first `{` is skipped.
    pub fn parse(command: &str, text: &str) -> Result<Self, SfkitError> {
        let json = text
            .find('{')
            .map(|start| &text[start..])
            .ok_or_else(|| SfkitError::CliOutput {
                command: command.to_string(),
                detail: if text.trim().is_empty() {
                    "empty output".to_string()
                } else {
                    format!("no JSON object in output: {}", truncate(text.trim(), 200))
                },
            })?;

        let raw: RawEnvelope = serde_json::from_str(json).map_err(|e| SfkitError::CliOutput {
            command: command.to_string(),
            detail: e.to_string(),
        })?;

        if raw.status != 0 {
            let mut message = raw
                .message
                .unwrap_or_else(|| format!("exited with status {}", raw.status));
            let details = raw
                .result
                .as_ref()
                .map(failed_component_details)
                .unwrap_or_default();
            if !details.is_empty() {
                message = format!("{} ({})", message, details.join("; "));
            }
            return Ok(CliOutcome::Failure {
                status: raw.status,
                name: raw.name.unwrap_or_else(|| "Error".to_string()),
                message,
            });
        }

        let result = serde_json::from_value(raw.result.unwrap_or(Value::Null)).map_err(|e| {
            SfkitError::CliOutput {
                command: command.to_string(),
                detail: format!("unexpected result shape: {}", e),
            }
        })?;
        let warnings = raw
            .warnings
            .into_iter()
            .map(|w| match w {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();

        Ok(CliOutcome::Success { result, warnings })
    }

    pub fn into_result(self, command: &str) -> Result<T, SfkitError> {
        match self {
            CliOutcome::Success { result, warnings } => {
                for warning in warnings {
                    warn!(command, "{}", warning);
                }
                Ok(result)
            }
            CliOutcome::Failure { name, message, .. } => {
                debug!(command, error = %name, "CLI reported failure");
                Err(SfkitError::cli_failed(command, message))
            }
        }
    }
}

/// Run a CLI command and decode its `result` into `T`.
pub async fn run_json<T: DeserializeOwned>(
    cli: &dyn SfCli,
    args: &[String],
) -> Result<T, SfkitError> {
    let command = args.join(" ");
    let output = cli.run(args).await?;

    // Failures are usually reported on stdout, but some CLI versions print them to stderr.
    let text = if output.stdout.contains('{') {
        output.stdout.as_str()
    } else if output.stderr.contains('{') {
        output.stderr.as_str()
    } else if output.status.unwrap_or(0) != 0 {
        let detail = if output.stderr.trim().is_empty() {
            format!("exited with status {:?}", output.status)
        } else {
            output.stderr.trim().to_string()
        };
        return Err(SfkitError::cli_failed(command, detail));
    } else {
        output.stdout.as_str()
    };

    CliOutcome::<T>::parse(&command, text)?.into_result(&command)
}

/// Build an argument vector from string slices.
pub fn args<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}

/// `Type Name: error` for every failed row in a deploy/retrieve `result.files`.
fn failed_component_details(result: &Value) -> Vec<String> {
    result
        .get("files")
        .and_then(Value::as_array)
        .map(|files| {
            files
                .iter()
                .filter(|f| {
                    f.get("state")
                        .and_then(Value::as_str)
                        .map(|s| s.eq_ignore_ascii_case("failed"))
                        .unwrap_or(false)
                })
                .map(|f| {
                    let field = |key: &str| f.get(key).and_then(Value::as_str).unwrap_or("");
                    format!("{} {}: {}", field("type"), field("fullName"), field("error"))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}
