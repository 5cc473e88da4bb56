//! Org presentation: cached identifiers, permission set lifecycle, labels, packages.

use super::shared::yes_no;
use crate::cache::OrgSnapshot;
use crate::labels::LabelWritten;
use crate::org::deploy::OperationReport;
use crate::org::records::{PermissionSet, Profile};
use crate::package::{PackageSummary, VersionCreateResult};
use crate::permset::{Assignment, Created, Deleted};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

pub fn format_refresh_summary(snapshot: &OrgSnapshot) -> String {
    format!(
        "Cached {} profiles and {} permission sets ({})",
        snapshot.profiles.len(),
        snapshot.permission_sets.len(),
        snapshot.refreshed_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

pub fn format_permission_sets_text(sets: &[PermissionSet]) -> String {
    if sets.is_empty() {
        return "No permission sets cached. Run `sfkit refresh`.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Label", "API name", "Namespace", "Id"]);
    for ps in sets {
        table.add_row(vec![
            ps.label.clone().unwrap_or_default(),
            ps.name.clone(),
            ps.namespace_prefix.clone().unwrap_or_default(),
            ps.id.clone(),
        ]);
    }
    table.to_string()
}

pub fn format_profiles_text(profiles: &[Profile]) -> String {
    if profiles.is_empty() {
        return "No profiles cached. Run `sfkit refresh`.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Id", "Editable"]);
    for profile in profiles {
        table.add_row(vec![
            profile.name.clone(),
            profile.id.clone(),
            yes_no(profile.permission_set_id.is_some()).to_string(),
        ]);
    }
    table.to_string()
}

pub fn format_created(created: &Created) -> String {
    let mut out = format!(
        "{} permission set {} ({})",
        "Created".green(),
        created.label,
        created.name
    );
    out.push_str(&format!("\n  Id: {}", created.id));
    if let Some(ref file) = created.file {
        out.push_str(&format!("\n  Retrieved: {}", file.display()));
    }
    out
}

pub fn format_deleted(deleted: &Deleted) -> String {
    let mut out = format!("{} permission set {}", "Deleted".green(), deleted.name);
    if deleted.removed_files.is_empty() {
        out.push_str("\n  No local files matched");
    }
    for file in &deleted.removed_files {
        out.push_str(&format!("\n  Removed: {}", file.display()));
    }
    out
}

pub fn format_assignment(assignment: &Assignment) -> String {
    match assignment {
        Assignment::Assigned {
            permission_set,
            username,
        } => format!("{} {} to {}", "Assigned".green(), permission_set, username),
        Assignment::AlreadyAssigned {
            permission_set,
            username,
        } => format!("{} is already assigned to {}", permission_set, username),
    }
}

pub fn format_label_written(label: &LabelWritten) -> String {
    let verb = match (label.changed, label.deployed) {
        (false, _) => "Unchanged",
        (true, true) => "Written and deployed",
        (true, false) => "Written",
    };
    format!("{} label {}\n  File: {}", verb, label.name, label.file.display())
}

pub fn format_packages_text(packages: &[PackageSummary]) -> String {
    if packages.is_empty() {
        return "No packages found.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Alias", "Type", "Namespace", "Id"]);
    for package in packages {
        table.add_row(vec![
            package.name.clone(),
            package.alias.clone().unwrap_or_default(),
            package.container_options.clone().unwrap_or_default(),
            package.namespace_prefix.clone().unwrap_or_default(),
            package.id.clone(),
        ]);
    }
    table.to_string()
}

pub fn format_version_result(result: &VersionCreateResult) -> String {
    let mut out = format!(
        "Package version request {}",
        result.status.as_deref().unwrap_or("submitted")
    );
    if let Some(ref id) = result.id {
        out.push_str(&format!("\n  Request id: {}", id));
    }
    if let Some(ref id) = result.subscriber_package_version_id {
        out.push_str(&format!("\n  Subscriber package version: {}", id));
    }
    out
}

pub fn format_operation_report(action: &str, report: &OperationReport) -> String {
    if report.files.is_empty() {
        return format!("{}: no components", action);
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Type", "Name", "State", "Path"]);
    for file in &report.files {
        table.add_row(vec![
            file.component_type.clone(),
            file.full_name.clone(),
            file.state.clone(),
            file.file_path.clone().unwrap_or_default(),
        ]);
    }
    format!("{} ({} components)\n{}", action, report.files.len(), table)
}
