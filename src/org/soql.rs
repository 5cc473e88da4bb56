//! SOQL templates used by sfkit. These are fixed queries, not a general query builder.

use crate::error::SfkitError;
use crate::org::cli::args;
use crate::org::records::QueryResult;
use crate::session::Session;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Run one of the templates through `sf data query` and return its records.
pub async fn query<T: DeserializeOwned>(session: &Session, soql: &str) -> Result<Vec<T>, SfkitError> {
    debug!(soql, "Running query");
    let mut cmd = args(["data", "query", "--query"]);
    cmd.push(soql.to_string());
    let result: QueryResult<T> = session.run_org(cmd).await?;
    Ok(result.records)
}

/// Quote a value as a SOQL string literal.
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

fn quote_list<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| quote(v.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn profiles() -> String {
    "SELECT Id, Name FROM Profile ORDER BY Name".to_string()
}

/// Permission sets owned by profiles, used to map a profile to its permission parent.
pub fn profile_owned_permission_sets() -> String {
    "SELECT Id, Name, ProfileId, Profile.Name FROM PermissionSet WHERE IsOwnedByProfile = true"
        .to_string()
}

pub fn permission_sets() -> String {
    "SELECT Id, Name, Label, NamespacePrefix, IsOwnedByProfile FROM PermissionSet \
     WHERE IsOwnedByProfile = false ORDER BY Label"
        .to_string()
}

pub fn permission_set_by_name(name: &str) -> String {
    format!(
        "SELECT Id, Name, Label, NamespacePrefix, IsOwnedByProfile FROM PermissionSet WHERE Name = {} LIMIT 1",
        quote(name)
    )
}

pub fn object_permissions<S: AsRef<str>>(object: &str, parent_ids: &[S]) -> String {
    format!(
        "SELECT Id, ParentId, SobjectType, PermissionsRead, PermissionsCreate, PermissionsEdit, \
         PermissionsDelete, PermissionsViewAllRecords, PermissionsModifyAllRecords \
         FROM ObjectPermissions WHERE SobjectType = {} AND ParentId IN ({})",
        quote(object),
        quote_list(parent_ids)
    )
}

pub fn field_permissions<S: AsRef<str>>(field_full_name: &str, parent_ids: &[S]) -> String {
    format!(
        "SELECT Id, ParentId, SobjectType, Field, PermissionsRead, PermissionsEdit \
         FROM FieldPermissions WHERE Field = {} AND ParentId IN ({})",
        quote(field_full_name),
        quote_list(parent_ids)
    )
}

pub fn permission_set_assignment(assignee_id: &str, permission_set_id: &str) -> String {
    format!(
        "SELECT Id FROM PermissionSetAssignment WHERE AssigneeId = {} AND PermissionSetId = {}",
        quote(assignee_id),
        quote(permission_set_id)
    )
}

pub fn user_by_username(username: &str) -> String {
    format!(
        "SELECT Id, Username FROM User WHERE Username = {} LIMIT 1",
        quote(username)
    )
}
