//! Object and field permission edits across one or more permission targets.
//!
//! One snapshot query per edit reads the org's current rows for every target.
//! Targets are then processed one at a time: merge, resolve the metadata file,
//! upsert, save, and deploy. A failure is recorded against its target and the
//! loop moves on.

use crate::error::SfkitError;
use crate::metadata::locate::resolve_target_file;
use crate::metadata::{FieldPermissionEntry, MetadataDocument, ObjectPermissionEntry, UpsertOutcome};
use crate::org::deploy::{deploy_source, retrieve_components};
use crate::org::records::{FieldPermissionsRecord, ObjectPermissionsRecord};
use crate::org::soql;
use crate::permissions::flags::{
    FieldFlagUpdate, FieldPermissionFlags, ObjectFlag, ObjectFlagUpdate, ObjectPermissionFlags,
};
use crate::permissions::PermissionTarget;
use crate::session::Session;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{info, warn};

/// What happened to one target.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetStatus {
    /// The file changed; `deployed` tells whether it was deployed.
    Updated { file: PathBuf, deployed: bool },
    /// The file already carried the requested flags.
    Unchanged { file: PathBuf },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    pub target: PermissionTarget,
    pub status: TargetStatus,
    /// Flags written (field edits report the field flags).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_flags: Option<ObjectPermissionFlags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_flags: Option<FieldPermissionFlags>,
    /// Whether object read access was added so the field entry takes effect.
    #[serde(default)]
    pub injected_object_read: bool,
}

impl TargetOutcome {
    pub fn failed(&self) -> bool {
        matches!(self.status, TargetStatus::Failed { .. })
    }

    fn failure(target: &PermissionTarget, error: &SfkitError) -> Self {
        Self {
            target: target.clone(),
            status: TargetStatus::Failed {
                error: error.to_string(),
            },
            object_flags: None,
            field_flags: None,
            injected_object_read: false,
        }
    }
}

/// Per-target results of one edit.
#[derive(Debug, Clone, Serialize)]
pub struct EditReport {
    pub subject: String,
    pub outcomes: Vec<TargetOutcome>,
}

impl EditReport {
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.failed()).count()
    }

    /// `Err(PartialFailure)` if any target failed.
    pub fn into_result(self) -> Result<Self, SfkitError> {
        let failed = self.failed_count();
        if failed == 0 {
            return Ok(self);
        }
        let mut report = String::new();
        for outcome in self.outcomes.iter() {
            if let TargetStatus::Failed { error } = &outcome.status {
                let _ = writeln!(report, "  {}: {}", outcome.target.display_name(), error);
            }
        }
        Err(SfkitError::PartialFailure {
            failed,
            total: self.outcomes.len(),
            report: report.trim_end().to_string(),
        })
    }
}

pub struct ObjectEdit {
    pub object: String,
    pub targets: Vec<PermissionTarget>,
    pub update: ObjectFlagUpdate,
    /// `false` skips the deploy even when `deploy_after_edit` is on.
    pub deploy: bool,
}

pub struct FieldEdit {
    pub object: String,
    /// `Object.Field`
    pub field: String,
    pub targets: Vec<PermissionTarget>,
    pub update: FieldFlagUpdate,
    pub deploy: bool,
}

/// Current org flags per parent id.
pub async fn object_snapshot(
    session: &Session,
    object: &str,
    targets: &[PermissionTarget],
) -> Result<HashMap<String, ObjectPermissionFlags>, SfkitError> {
    let parent_ids: Vec<&str> = targets.iter().map(PermissionTarget::parent_id).collect();
    if parent_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<ObjectPermissionsRecord> =
        soql::query(session, &soql::object_permissions(object, &parent_ids)).await?;
    Ok(rows
        .iter()
        .map(|row| (row.parent_id.clone(), ObjectPermissionFlags::from_record(row)))
        .collect())
}

pub async fn field_snapshot(
    session: &Session,
    field: &str,
    targets: &[PermissionTarget],
) -> Result<HashMap<String, FieldPermissionFlags>, SfkitError> {
    let parent_ids: Vec<&str> = targets.iter().map(PermissionTarget::parent_id).collect();
    if parent_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<FieldPermissionsRecord> =
        soql::query(session, &soql::field_permissions(field, &parent_ids)).await?;
    Ok(rows
        .iter()
        .map(|row| (row.parent_id.clone(), FieldPermissionFlags::from_record(row)))
        .collect())
}

pub struct PermissionEditor<'a> {
    session: &'a Session,
}

impl<'a> PermissionEditor<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Apply an object flag update to every target.
    pub async fn edit_object(&self, edit: &ObjectEdit) -> Result<EditReport, SfkitError> {
        validate_request(&edit.targets, edit.update.is_empty())?;
        let snapshot = object_snapshot(self.session, &edit.object, &edit.targets).await?;

        let mut outcomes = Vec::with_capacity(edit.targets.len());
        for target in &edit.targets {
            let existing = snapshot.get(target.parent_id()).copied().unwrap_or_default();
            let flags = edit.update.apply(existing);
            let outcome = match self.write_object(target, &edit.object, flags, edit.deploy).await {
                Ok(status) => TargetOutcome {
                    target: target.clone(),
                    status,
                    object_flags: Some(flags),
                    field_flags: None,
                    injected_object_read: false,
                },
                Err(e) => {
                    warn!(target = %target.name(), error = %e, "Object permission edit failed");
                    TargetOutcome::failure(target, &e)
                }
            };
            outcomes.push(outcome);
        }

        Ok(EditReport {
            subject: edit.object.clone(),
            outcomes,
        })
    }

    /// Apply a field flag update to every target, granting object read where needed.
    pub async fn edit_field(&self, edit: &FieldEdit) -> Result<EditReport, SfkitError> {
        validate_request(&edit.targets, edit.update.is_empty())?;
        let field_rows = field_snapshot(self.session, &edit.field, &edit.targets).await?;
        let object_rows = object_snapshot(self.session, &edit.object, &edit.targets).await?;

        let mut outcomes = Vec::with_capacity(edit.targets.len());
        for target in &edit.targets {
            let existing = field_rows.get(target.parent_id()).copied().unwrap_or_default();
            let flags = edit.update.apply(existing);
            let object_flags = object_rows.get(target.parent_id()).copied();
            let outcome = match self
                .write_field(target, edit, flags, object_flags)
                .await
            {
                Ok((status, injected)) => TargetOutcome {
                    target: target.clone(),
                    status,
                    object_flags: None,
                    field_flags: Some(flags),
                    injected_object_read: injected,
                },
                Err(e) => {
                    warn!(target = %target.name(), error = %e, "Field permission edit failed");
                    TargetOutcome::failure(target, &e)
                }
            };
            outcomes.push(outcome);
        }

        Ok(EditReport {
            subject: edit.field.clone(),
            outcomes,
        })
    }

    async fn write_object(
        &self,
        target: &PermissionTarget,
        object: &str,
        flags: ObjectPermissionFlags,
        deploy: bool,
    ) -> Result<TargetStatus, SfkitError> {
        let file = resolve_target_file(self.session, target).await?;
        let mut document = MetadataDocument::load(&file)?;
        let outcome = document.upsert(&ObjectPermissionEntry {
            object: object.to_string(),
            flags,
        })?;
        self.finish(target, file, &document, outcome, deploy).await
    }

    async fn write_field(
        &self,
        target: &PermissionTarget,
        edit: &FieldEdit,
        flags: FieldPermissionFlags,
        org_object_flags: Option<ObjectPermissionFlags>,
    ) -> Result<(TargetStatus, bool), SfkitError> {
        let file = resolve_target_file(self.session, target).await?;
        let mut document = MetadataDocument::load(&file)?;

        // The file is what gets deployed, so only its object entry counts as read access.
        let mut injected = false;
        let file_object_flags = document.object_permissions(&edit.object)?;
        let file_has_read = file_object_flags.map(|f| f.allow_read).unwrap_or(false);
        let mut object_outcome = UpsertOutcome::Unchanged;
        if flags.readable && !file_has_read {
            let base = file_object_flags.or(org_object_flags).unwrap_or_default();
            let object_flags = ObjectFlagUpdate::new().grant(ObjectFlag::Read).apply(base);
            object_outcome = document.upsert(&ObjectPermissionEntry {
                object: edit.object.clone(),
                flags: object_flags,
            })?;
            injected = true;
            info!(target = %target.name(), object = %edit.object, "Granting object read for field access");
        }

        let field_outcome = document.upsert(&FieldPermissionEntry {
            field: edit.field.clone(),
            flags,
        })?;
        let outcome = if object_outcome == UpsertOutcome::Unchanged {
            field_outcome
        } else {
            object_outcome
        };
        let status = self.finish(target, file, &document, outcome, edit.deploy).await?;
        Ok((status, injected))
    }

    /// Save a changed document, then deploy and optionally retrieve it.
    async fn finish(
        &self,
        target: &PermissionTarget,
        file: PathBuf,
        document: &MetadataDocument,
        outcome: UpsertOutcome,
        deploy: bool,
    ) -> Result<TargetStatus, SfkitError> {
        if outcome == UpsertOutcome::Unchanged {
            info!(target = %target.name(), "Metadata already up to date");
            return Ok(TargetStatus::Unchanged { file });
        }
        document.save(&file)?;

        let config = &self.session.config().metadata;
        let deployed = deploy && config.deploy_after_edit;
        if deployed {
            deploy_source(self.session, std::slice::from_ref(&file)).await?;
            info!(target = %target.name(), file = %file.display(), "Deployed");

            if config.retrieve_after_edit {
                if let Err(e) = retrieve_components(self.session, &[target.component()]).await {
                    warn!(target = %target.name(), error = %e, "Retrieve after edit failed");
                }
            }
        }

        Ok(TargetStatus::Updated { file, deployed })
    }
}

fn validate_request(targets: &[PermissionTarget], update_is_empty: bool) -> Result<(), SfkitError> {
    if targets.is_empty() {
        return Err(SfkitError::InvalidInput(
            "no permission sets or profiles selected".to_string(),
        ));
    }
    if update_is_empty {
        return Err(SfkitError::InvalidInput("no permission changes requested".to_string()));
    }
    Ok(())
}
