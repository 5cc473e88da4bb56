//! Find metadata source files in the workspace, retrieving them from the org when absent.

use crate::error::SfkitError;
use crate::org::deploy::retrieve_components;
use crate::permissions::PermissionTarget;
use crate::session::Session;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Directories never searched for metadata.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", ".sf", ".sfdx", ".sfkit"];

pub const CUSTOM_LABELS_FILE: &str = "CustomLabels.labels-meta.xml";

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| SKIPPED_DIRS.contains(&name))
            .unwrap_or(false)
}

/// Every file under `root` whose name satisfies `matches`, sorted by path.
fn find_files<F>(root: &Path, matches: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> bool,
{
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "Skipping unreadable path");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_str().map(&matches).unwrap_or(false))
        .map(DirEntry::into_path)
        .collect();
    found.sort();
    found
}

/// First file in the workspace named exactly `file_name`.
pub fn find_metadata_file(root: &Path, file_name: &str) -> Option<PathBuf> {
    find_files(root, |name| name == file_name).into_iter().next()
}

/// Local files to remove when a permission set is deleted: basename equal to
/// `{name}.permissionset-meta.xml`, compared case-insensitively.
pub fn find_permission_set_files_for_deletion(root: &Path, name: &str) -> Vec<PathBuf> {
    let wanted = format!("{}.permissionset-meta.xml", name).to_lowercase();
    find_files(root, |file| file.to_lowercase() == wanted)
}

/// Existing CustomLabels file, or where a new one belongs in the default package directory.
pub fn custom_labels_path(session: &Session) -> PathBuf {
    find_metadata_file(session.workspace_root(), CUSTOM_LABELS_FILE).unwrap_or_else(|| {
        session
            .project()
            .default_package_path(session.workspace_root())
            .join("main")
            .join("default")
            .join("labels")
            .join(CUSTOM_LABELS_FILE)
    })
}

/// Local metadata file of a permission target, retrieving it when absent.
pub async fn resolve_target_file(
    session: &Session,
    target: &PermissionTarget,
) -> Result<PathBuf, SfkitError> {
    let root = session.workspace_root();
    let file_name = target.file_name();
    if let Some(path) = find_metadata_file(root, &file_name) {
        debug!(target = %target.name(), path = %path.display(), "Metadata file found locally");
        return Ok(path);
    }

    info!(component = %target.component(), "Metadata file not in workspace, retrieving");
    match retrieve_components(session, &[target.component()]).await {
        Ok(report) => {
            let retrieved = report.file_paths().into_iter().find(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n == file_name)
                    .unwrap_or(false)
            });
            if let Some(path) = retrieved {
                let path = if path.is_absolute() {
                    path
                } else {
                    root.join(path)
                };
                if path.is_file() {
                    return Ok(path);
                }
            }
        }
        Err(e) => {
            warn!(component = %target.component(), error = %e, "Retrieve failed");
            return Err(SfkitError::TargetNotFound(format!(
                "{} ({}; retrieve failed: {})",
                file_name,
                target.display_name(),
                e
            )));
        }
    }

    find_metadata_file(root, &file_name)
        .ok_or_else(|| SfkitError::TargetNotFound(format!("{} ({})", file_name, target.display_name())))
}
