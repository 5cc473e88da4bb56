//! Salesforce DX project discovery and `sfdx-project.json`.

use crate::error::SfkitError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const PROJECT_FILE: &str = "sfdx-project.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDirectory {
    pub path: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SfdxProject {
    #[serde(default)]
    pub package_directories: Vec<PackageDirectory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_api_version: Option<String>,
    #[serde(default)]
    pub package_aliases: BTreeMap<String, String>,
}

impl SfdxProject {
    pub fn load(workspace_root: &Path) -> Result<Self, SfkitError> {
        let path = workspace_root.join(PROJECT_FILE);
        if !path.is_file() {
            return Err(SfkitError::NotAProject(workspace_root.to_path_buf()));
        }
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text).map_err(|e| {
            SfkitError::InvalidInput(format!("{} is not valid: {}", path.display(), e))
        })
    }

    /// The package directory marked `default`, else the first one.
    pub fn default_package_dir(&self) -> Option<&PackageDirectory> {
        self.package_directories
            .iter()
            .find(|dir| dir.default)
            .or_else(|| self.package_directories.first())
    }

    /// Absolute path of the default package directory (`force-app` when none is declared).
    pub fn default_package_path(&self, workspace_root: &Path) -> PathBuf {
        let relative = self
            .default_package_dir()
            .map(|dir| dir.path.as_str())
            .unwrap_or("force-app");
        workspace_root.join(relative)
    }

    /// Package directory declaring `package`.
    pub fn package_dir(&self, package: &str) -> Option<&PackageDirectory> {
        self.package_directories
            .iter()
            .find(|dir| dir.package.as_deref() == Some(package))
    }
}

/// Walk up from `start` to the nearest directory containing `sfdx-project.json`.
pub fn find_workspace_root(start: &Path) -> Result<PathBuf, SfkitError> {
    if !start.exists() {
        return Err(SfkitError::NoWorkspace(start.to_path_buf()));
    }
    let start = dunce::canonicalize(start)?;
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_FILE).is_file())
        .map(Path::to_path_buf)
        .ok_or(SfkitError::NotAProject(start))
}
