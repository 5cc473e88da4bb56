//! Permission containers: standalone permission sets and profiles.
//!
//! A profile's object and field permissions live on its profile-owned permission
//! set, so both variants expose a `parent_id` usable as `ParentId` in
//! ObjectPermissions/FieldPermissions queries.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PermissionTarget {
    PermissionSet {
        id: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace_prefix: Option<String>,
    },
    Profile {
        id: String,
        name: String,
        permission_set_id: String,
    },
}

impl PermissionTarget {
    /// Id of the permission set that owns the permission rows.
    pub fn parent_id(&self) -> &str {
        match self {
            PermissionTarget::PermissionSet { id, .. } => id,
            PermissionTarget::Profile {
                permission_set_id, ..
            } => permission_set_id,
        }
    }

    /// Metadata API name.
    pub fn name(&self) -> &str {
        match self {
            PermissionTarget::PermissionSet { name, .. } | PermissionTarget::Profile { name, .. } => {
                name
            }
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            PermissionTarget::PermissionSet { name, label, .. } => match label {
                Some(label) if label != name => format!("{} ({})", label, name),
                _ => name.clone(),
            },
            PermissionTarget::Profile { name, .. } => format!("Profile: {}", name),
        }
    }

    pub fn metadata_type(&self) -> &'static str {
        match self {
            PermissionTarget::PermissionSet { .. } => "PermissionSet",
            PermissionTarget::Profile { .. } => "Profile",
        }
    }

    /// Source-format file name, e.g. `Sales.permissionset-meta.xml`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name(), self.file_suffix())
    }

    pub fn file_suffix(&self) -> &'static str {
        match self {
            PermissionTarget::PermissionSet { .. } => "permissionset-meta.xml",
            PermissionTarget::Profile { .. } => "profile-meta.xml",
        }
    }

    /// `Type:Name` component reference for retrieve/deploy/delete.
    pub fn component(&self) -> String {
        format!("{}:{}", self.metadata_type(), self.name())
    }

    pub fn is_profile(&self) -> bool {
        matches!(self, PermissionTarget::Profile { .. })
    }
}

impl fmt::Display for PermissionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
