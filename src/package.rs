//! Second-generation package listing and version creation.

use crate::error::SfkitError;
use crate::org::cli::args;
use crate::session::Session;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Row of `sf package list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageSummary {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace_prefix: Option<String>,
    #[serde(default)]
    pub container_options: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VersionRequest {
    /// Package id or alias.
    pub package: String,
    pub installation_key: Option<String>,
    pub wait_minutes: Option<u32>,
    pub code_coverage: bool,
    pub skip_validation: bool,
}

/// Result of `sf package version create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionCreateResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub package2_version_id: Option<String>,
    #[serde(default)]
    pub subscriber_package_version_id: Option<String>,
    #[serde(default)]
    pub error: Vec<String>,
}

/// Packages in the target Dev Hub.
pub async fn list(session: &Session) -> Result<Vec<PackageSummary>, SfkitError> {
    let packages: Vec<PackageSummary> = run_dev_hub(session, args(["package", "list"])).await?;
    info!(count = packages.len(), "Packages listed");
    Ok(packages)
}

pub async fn create_version(
    session: &Session,
    request: &VersionRequest,
) -> Result<VersionCreateResult, SfkitError> {
    let package = request.package.trim();
    if package.is_empty() {
        return Err(SfkitError::InvalidInput("package id or alias is empty".to_string()));
    }

    let result: VersionCreateResult =
        run_dev_hub(session, version_create_args(package, request)).await?;
    if !result.error.is_empty() {
        return Err(SfkitError::cli_failed("package version create", result.error.join("; ")));
    }
    info!(
        package,
        status = result.status.as_deref().unwrap_or("unknown"),
        "Package version requested"
    );
    Ok(result)
}

/// Package commands take the Dev Hub as `--target-dev-hub`; they reject `--target-org`.
async fn run_dev_hub<T: DeserializeOwned>(
    session: &Session,
    mut cmd: Vec<String>,
) -> Result<T, SfkitError> {
    let hub = session.target_org().await?;
    cmd.push("--target-dev-hub".to_string());
    cmd.push(hub);
    session.run_raw(cmd).await
}

fn version_create_args(package: &str, request: &VersionRequest) -> Vec<String> {
    let mut cmd = args(["package", "version", "create", "--package", package]);
    match &request.installation_key {
        Some(key) => {
            cmd.push("--installation-key".to_string());
            cmd.push(key.clone());
        }
        None => cmd.push("--installation-key-bypass".to_string()),
    }
    if let Some(wait) = request.wait_minutes {
        cmd.push("--wait".to_string());
        cmd.push(wait.to_string());
    }
    if request.code_coverage {
        cmd.push("--code-coverage".to_string());
    }
    if request.skip_validation {
        cmd.push("--skip-validation".to_string());
    }
    cmd
}
