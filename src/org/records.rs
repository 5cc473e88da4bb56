//! Rows returned by `sf data query` and cached org identifiers.

use serde::{Deserialize, Serialize};

/// `result` of `sf data query --json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
    #[serde(default)]
    pub total_size: u64,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    /// Id of the profile-owned permission set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_set_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_owned_by_profile: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProfileRow {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameRef {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermissionSetRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub namespace_prefix: Option<String>,
    #[serde(default)]
    pub is_owned_by_profile: Option<bool>,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub profile: Option<NameRef>,
}

impl From<PermissionSetRow> for PermissionSet {
    fn from(row: PermissionSetRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            label: row.label,
            namespace_prefix: row.namespace_prefix,
            is_owned_by_profile: row.is_owned_by_profile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectPermissionsRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub parent_id: String,
    pub sobject_type: String,
    #[serde(default)]
    pub permissions_read: bool,
    #[serde(default)]
    pub permissions_create: bool,
    #[serde(default)]
    pub permissions_edit: bool,
    #[serde(default)]
    pub permissions_delete: bool,
    #[serde(default)]
    pub permissions_view_all_records: bool,
    #[serde(default)]
    pub permissions_modify_all_records: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FieldPermissionsRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub parent_id: String,
    pub sobject_type: String,
    pub field: String,
    #[serde(default)]
    pub permissions_read: bool,
    #[serde(default)]
    pub permissions_edit: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IdRow {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserRow {
    pub id: String,
    pub username: String,
}

/// The user the CLI is authenticated as (`sf org display user`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUser {
    pub id: String,
    pub username: String,
}
