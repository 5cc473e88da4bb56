//! Permission set lifecycle: list, create, delete, assign.

use crate::cache::OrgSnapshot;
use crate::error::SfkitError;
use crate::metadata::locate::find_permission_set_files_for_deletion;
use crate::names::label_to_developer_name;
use crate::org::cli::args;
use crate::org::deploy::{delete_components, retrieve_components};
use crate::org::records::{IdRow, OrgUser, PermissionSet, PermissionSetRow, UserRow};
use crate::org::rest::{NewPermissionSet, RestClient};
use crate::org::soql;
use crate::session::Session;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub label: String,
    /// API name; derived from the label when `None`.
    pub name: Option<String>,
    pub description: Option<String>,
    pub activation_required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Created {
    pub id: String,
    pub name: String,
    pub label: String,
    /// Local file written by the follow-up retrieve, if one ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Deleted {
    pub name: String,
    pub removed_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Assignment {
    Assigned { permission_set: String, username: String },
    AlreadyAssigned { permission_set: String, username: String },
}

/// Create a permission set through the REST API.
pub async fn create(session: &Session, request: &CreateRequest) -> Result<Created, SfkitError> {
    let label = request.label.trim();
    if label.is_empty() {
        return Err(SfkitError::InvalidInput("permission set label is empty".to_string()));
    }
    let name = match request.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => label_to_developer_name(label),
    };
    if name.is_empty() {
        return Err(SfkitError::InvalidInput(format!(
            "cannot derive an API name from label {:?}",
            label
        )));
    }

    let connection = session.connection().await?;
    let api_version = session.api_version(&connection);
    let body = NewPermissionSet {
        label: label.to_string(),
        name: name.clone(),
        description: request.description.clone().filter(|d| !d.trim().is_empty()),
        has_activation_required: request.activation_required,
    };
    let record = RestClient::new()?
        .create_permission_set(&connection, &api_version, &body)
        .await?;

    remember(session, PermissionSet {
        id: record.id.clone(),
        name: name.clone(),
        label: Some(label.to_string()),
        namespace_prefix: None,
        is_owned_by_profile: Some(false),
    });

    let mut file = None;
    if session.config().metadata.retrieve_after_create {
        match retrieve_components(session, &[format!("PermissionSet:{}", name)]).await {
            Ok(report) => file = report.file_paths().into_iter().next(),
            Err(e) => warn!(name = %name, error = %e, "Retrieve after create failed"),
        }
    }

    Ok(Created {
        id: record.id,
        name,
        label: label.to_string(),
        file,
    })
}

/// Add a newly created set to the cached snapshot so prompts see it before the next refresh.
fn remember(session: &Session, permission_set: PermissionSet) {
    let result = session.snapshot().and_then(|snapshot| match snapshot {
        Some(mut snapshot) => {
            snapshot.permission_sets.retain(|ps| ps.name != permission_set.name);
            snapshot.permission_sets.push(permission_set);
            session.cache().store_snapshot(&snapshot)
        }
        None => Ok(()),
    });
    if let Err(e) = result {
        warn!(error = %e, "Could not update cached permission sets");
    }
}

/// Delete a permission set from the org, then remove its local source files.
pub async fn delete(session: &Session, name: &str) -> Result<Deleted, SfkitError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SfkitError::InvalidInput("permission set name is empty".to_string()));
    }
    delete_components(session, &[format!("PermissionSet:{}", name)]).await?;

    let mut removed_files = Vec::new();
    for path in find_permission_set_files_for_deletion(session.workspace_root(), name) {
        match fs::remove_file(&path) {
            Ok(()) => removed_files.push(path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    forget(session, name);
    info!(name, removed = removed_files.len(), "Permission set deleted");
    Ok(Deleted {
        name: name.to_string(),
        removed_files,
    })
}

fn forget(session: &Session, name: &str) {
    let result = session.snapshot().and_then(|snapshot| match snapshot {
        Some(mut snapshot) => {
            snapshot
                .permission_sets
                .retain(|ps| !ps.name.eq_ignore_ascii_case(name));
            session.cache().store_snapshot(&snapshot)
        }
        None => Ok(()),
    });
    if let Err(e) = result {
        warn!(error = %e, "Could not update cached permission sets");
    }
}

/// Assign a permission set to `username`, or to the current user.
pub async fn assign(
    session: &Session,
    name: &str,
    username: Option<&str>,
) -> Result<Assignment, SfkitError> {
    let rows: Vec<PermissionSetRow> =
        soql::query(session, &soql::permission_set_by_name(name)).await?;
    let permission_set = rows
        .into_iter()
        .next()
        .ok_or_else(|| SfkitError::UnknownTarget(name.to_string()))?;

    let user = match username {
        Some(username) => find_user(session, username).await?,
        None => session.current_user().await?,
    };

    let existing: Vec<IdRow> = soql::query(
        session,
        &soql::permission_set_assignment(&user.id, &permission_set.id),
    )
    .await?;
    if !existing.is_empty() {
        info!(permission_set = %permission_set.name, user = %user.username, "Already assigned");
        return Ok(Assignment::AlreadyAssigned {
            permission_set: permission_set.name,
            username: user.username,
        });
    }

    let mut cmd = args(["org", "assign", "permset", "--name", permission_set.name.as_str()]);
    if username.is_some() {
        cmd.push("--on-behalf-of".to_string());
        cmd.push(user.username.clone());
    }
    let _: serde_json::Value = session.run_org(cmd).await?;
    info!(permission_set = %permission_set.name, user = %user.username, "Permission set assigned");
    Ok(Assignment::Assigned {
        permission_set: permission_set.name,
        username: user.username,
    })
}

async fn find_user(session: &Session, username: &str) -> Result<OrgUser, SfkitError> {
    let rows: Vec<UserRow> = soql::query(session, &soql::user_by_username(username)).await?;
    rows.into_iter()
        .next()
        .map(|row| OrgUser {
            id: row.id,
            username: row.username,
        })
        .ok_or_else(|| SfkitError::InvalidInput(format!("no user with username {}", username)))
}

/// Cached permission sets, sorted by label.
pub fn list(snapshot: &OrgSnapshot) -> Vec<PermissionSet> {
    let mut sets = snapshot.permission_sets.clone();
    sets.sort_by_key(|ps| ps.label.clone().unwrap_or_else(|| ps.name.clone()).to_lowercase());
    sets
}
