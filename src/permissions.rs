//! Permission editing for permission sets and profiles.
//!
//! `flags` holds the flag sets and their implication rules, `target` the
//! permission-set/profile union, and `edit` the per-target edit loop.

pub mod edit;
pub mod flags;
pub mod target;

pub use edit::{EditReport, FieldEdit, ObjectEdit, PermissionEditor, TargetOutcome, TargetStatus};
pub use flags::{
    FieldFlag, FieldFlagUpdate, FieldPermissionFlags, ObjectFlag, ObjectFlagUpdate,
    ObjectPermissionFlags,
};
pub use target::PermissionTarget;

use crate::cache::OrgSnapshot;
use crate::error::SfkitError;
use serde::Serialize;

/// Current org flags of one target, as printed by `perms show`.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionView {
    pub target: PermissionTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<ObjectPermissionFlags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldPermissionFlags>,
}

/// Resolve target names against the cached snapshot.
///
/// A name matches a permission set by API name or label, or a profile by name
/// (a `profile:` prefix restricts the lookup to profiles).
pub fn resolve_targets(
    snapshot: &OrgSnapshot,
    names: &[String],
) -> Result<Vec<PermissionTarget>, SfkitError> {
    let mut resolved: Vec<PermissionTarget> = Vec::with_capacity(names.len());
    for name in names {
        let target = match name.strip_prefix("profile:") {
            Some(profile) => snapshot.profile(profile.trim()),
            None => snapshot
                .permission_set(name)
                .or_else(|| snapshot.profile(name)),
        }
        .ok_or_else(|| SfkitError::UnknownTarget(name.clone()))?;

        if !resolved.iter().any(|t| t.parent_id() == target.parent_id()) {
            resolved.push(target);
        }
    }
    Ok(resolved)
}
