//! Source deploy, retrieve, and delete through the CLI.

use crate::error::SfkitError;
use crate::org::cli::args;
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// One component row of a deploy/retrieve/delete result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentFile {
    #[serde(default)]
    pub full_name: String,
    #[serde(rename = "type", default)]
    pub component_type: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ComponentFile {
    pub fn failed(&self) -> bool {
        self.state.eq_ignore_ascii_case("failed")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReport {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub files: Vec<ComponentFile>,
}

impl OperationReport {
    /// Paths of the local files touched by the operation.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter_map(|f| f.file_path.as_ref().map(PathBuf::from))
            .collect()
    }

    fn ensure_succeeded(self, command: &str) -> Result<Self, SfkitError> {
        let failures: Vec<String> = self
            .files
            .iter()
            .filter(|f| f.failed())
            .map(|f| {
                format!(
                    "{} {}: {}",
                    f.component_type,
                    f.full_name,
                    f.error.as_deref().unwrap_or("failed")
                )
            })
            .collect();
        if self.success == Some(false) || !failures.is_empty() {
            let message = if failures.is_empty() {
                format!("status {}", self.status.as_deref().unwrap_or("Failed"))
            } else {
                failures.join("; ")
            };
            return Err(SfkitError::cli_failed(command, message));
        }
        Ok(self)
    }
}

/// Deploy the given source paths (files or directories).
pub async fn deploy_source(
    session: &Session,
    paths: &[PathBuf],
) -> Result<OperationReport, SfkitError> {
    if paths.is_empty() {
        return Err(SfkitError::InvalidInput("nothing to deploy".to_string()));
    }
    let mut cmd = args(["project", "deploy", "start"]);
    for path in paths {
        cmd.push("--source-dir".to_string());
        cmd.push(relative_to(session.workspace_root(), path));
    }
    info!(paths = paths.len(), "Deploying source");
    let report: OperationReport = session.run_org(cmd).await?;
    report.ensure_succeeded("project deploy start")
}

/// Retrieve named components (`Type:Name`).
pub async fn retrieve_components(
    session: &Session,
    components: &[String],
) -> Result<OperationReport, SfkitError> {
    if components.is_empty() {
        return Err(SfkitError::InvalidInput("nothing to retrieve".to_string()));
    }
    let mut cmd = args(["project", "retrieve", "start"]);
    for component in components {
        cmd.push("--metadata".to_string());
        cmd.push(component.clone());
    }
    info!(components = %components.join(","), "Retrieving metadata");
    let report: OperationReport = session.run_org(cmd).await?;
    report.ensure_succeeded("project retrieve start")
}

/// Delete named components from the org (and the CLI's local copies).
pub async fn delete_components(
    session: &Session,
    components: &[String],
) -> Result<OperationReport, SfkitError> {
    let mut cmd = args(["project", "delete", "source", "--no-prompt"]);
    for component in components {
        cmd.push("--metadata".to_string());
        cmd.push(component.clone());
    }
    info!(components = %components.join(","), "Deleting metadata from org");
    let report: OperationReport = session.run_org(cmd).await?;
    report.ensure_succeeded("project delete source")
}

fn relative_to(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
