//! Workspace status data and formatting for `sfkit status`.
//!
//! Collects the resolved project, the target org (or why it could not be
//! resolved), the config files that apply, and the cache state. Resolving the
//! org may shell out to the CLI; a failure there is reported, not raised.

use crate::config::ConfigLoader;
use crate::session::Session;
use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct PackageDirectoryStatus {
    pub path: String,
    pub default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub refreshed_at: DateTime<Utc>,
    pub profiles: usize,
    pub permission_sets: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceStatus {
    pub workspace_root: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_api_version: Option<String>,
    pub package_directories: Vec<PackageDirectoryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_org: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_error: Option<String>,
    pub config_files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStatus>,
    pub refresh_interval_minutes: u64,
}

pub async fn collect(session: &Session) -> WorkspaceStatus {
    let project = session.project();
    let (target_org, org_error) = match session.target_org().await {
        Ok(org) => (Some(org), None),
        Err(e) => (None, Some(e.to_string())),
    };
    let cache = match session.snapshot() {
        Ok(snapshot) => snapshot.map(|s| CacheStatus {
            refreshed_at: s.refreshed_at,
            profiles: s.profiles.len(),
            permission_sets: s.permission_sets.len(),
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Cache unreadable");
            None
        }
    };

    WorkspaceStatus {
        workspace_root: session.workspace_root().to_path_buf(),
        project_name: project.name.clone(),
        source_api_version: project.source_api_version.clone(),
        package_directories: project
            .package_directories
            .iter()
            .map(|dir| PackageDirectoryStatus {
                path: dir.path.clone(),
                default: dir.default,
                package: dir.package.clone(),
            })
            .collect(),
        target_org,
        org_error,
        config_files: ConfigLoader::config_files(session.workspace_root(), session.config_file())
            .into_iter()
            .filter(|p| p.is_file())
            .collect(),
        cache,
        refresh_interval_minutes: session.config().refresh.interval_minutes,
    }
}

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn format_status_text(status: &WorkspaceStatus) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Project")));
    out.push_str(&format!("  Root: {}\n", status.workspace_root.display()));
    if let Some(ref name) = status.project_name {
        out.push_str(&format!("  Name: {}\n", name));
    }
    if let Some(ref version) = status.source_api_version {
        out.push_str(&format!("  Source API version: {}\n", version));
    }
    if !status.package_directories.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Package directory", "Default", "Package"]);
        for dir in &status.package_directories {
            table.add_row(vec![
                dir.path.clone(),
                if dir.default { "yes" } else { "" }.to_string(),
                dir.package.clone().unwrap_or_default(),
            ]);
        }
        out.push_str(&format!("\n{}\n", table));
    }

    out.push_str(&format!("\n{}\n\n", format_section_heading("Org")));
    match (&status.target_org, &status.org_error) {
        (Some(org), _) => out.push_str(&format!("  Target org: {}\n", org.green())),
        (None, Some(err)) => out.push_str(&format!("  Target org: {}\n", err.yellow())),
        (None, None) => out.push_str("  Target org: -\n"),
    }

    out.push_str(&format!("\n{}\n\n", format_section_heading("Cache")));
    match &status.cache {
        Some(cache) => {
            out.push_str(&format!(
                "  Refreshed: {}\n",
                cache.refreshed_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
            out.push_str(&format!("  Profiles: {}\n", cache.profiles));
            out.push_str(&format!("  Permission sets: {}\n", cache.permission_sets));
        }
        None => out.push_str("  Never refreshed. Run `sfkit refresh`.\n"),
    }
    if status.refresh_interval_minutes == 0 {
        out.push_str("  Background refresh: disabled\n");
    } else {
        out.push_str(&format!(
            "  Background refresh: every {} min (watch)\n",
            status.refresh_interval_minutes
        ));
    }

    out.push_str(&format!("\n{}\n\n", format_section_heading("Config")));
    if status.config_files.is_empty() {
        out.push_str("  Defaults only\n");
    } else {
        for file in &status.config_files {
            out.push_str(&format!("  {}\n", file.display()));
        }
    }
    out
}
