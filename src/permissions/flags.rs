//! Object and field permission flag sets.
//!
//! Implication rules applied by `normalize`:
//! - `modifyAllRecords` implies `allowRead` and `allowEdit`
//! - `viewAllRecords` implies `allowRead`
//! - `allowEdit` implies `allowRead`
//! - `editable` implies `readable`
//!
//! Updates are partial (`Some(true)` grants, `Some(false)` revokes, `None` keeps the
//! existing value). A revoke also clears every flag that implies the revoked one, so
//! normalization cannot bring it back. An interactive selection is turned into an
//! update by diffing it against the flags the prompt started with, so flags the
//! user never touched are kept on every target.

use crate::org::records::{FieldPermissionsRecord, ObjectPermissionsRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectFlag {
    Read,
    Create,
    Edit,
    Delete,
    ViewAll,
    ModifyAll,
}

impl ObjectFlag {
    pub const ALL: [ObjectFlag; 6] = [
        ObjectFlag::Read,
        ObjectFlag::Create,
        ObjectFlag::Edit,
        ObjectFlag::Delete,
        ObjectFlag::ViewAll,
        ObjectFlag::ModifyAll,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ObjectFlag::Read => "Read",
            ObjectFlag::Create => "Create",
            ObjectFlag::Edit => "Edit",
            ObjectFlag::Delete => "Delete",
            ObjectFlag::ViewAll => "View All",
            ObjectFlag::ModifyAll => "Modify All",
        }
    }

    /// Flags that directly imply `self`.
    fn implied_by(self) -> &'static [ObjectFlag] {
        match self {
            ObjectFlag::Read => &[ObjectFlag::Edit, ObjectFlag::ViewAll, ObjectFlag::ModifyAll],
            ObjectFlag::Edit => &[ObjectFlag::ModifyAll],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldFlag {
    Read,
    Edit,
}

impl FieldFlag {
    pub const ALL: [FieldFlag; 2] = [FieldFlag::Read, FieldFlag::Edit];

    pub fn label(self) -> &'static str {
        match self {
            FieldFlag::Read => "Read",
            FieldFlag::Edit => "Edit",
        }
    }
}

/// CRUD flags for one object on one permission container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPermissionFlags {
    pub allow_read: bool,
    pub allow_create: bool,
    pub allow_edit: bool,
    pub allow_delete: bool,
    pub view_all_records: bool,
    pub modify_all_records: bool,
}

impl ObjectPermissionFlags {
    /// Apply implication rules. Idempotent.
    pub fn normalize(self) -> Self {
        let mut flags = self;
        if flags.modify_all_records {
            flags.allow_read = true;
            flags.allow_edit = true;
        }
        if flags.view_all_records {
            flags.allow_read = true;
        }
        if flags.allow_edit {
            flags.allow_read = true;
        }
        flags
    }

    pub fn from_record(record: &ObjectPermissionsRecord) -> Self {
        Self {
            allow_read: record.permissions_read,
            allow_create: record.permissions_create,
            allow_edit: record.permissions_edit,
            allow_delete: record.permissions_delete,
            view_all_records: record.permissions_view_all_records,
            modify_all_records: record.permissions_modify_all_records,
        }
    }

    pub fn get(&self, flag: ObjectFlag) -> bool {
        match flag {
            ObjectFlag::Read => self.allow_read,
            ObjectFlag::Create => self.allow_create,
            ObjectFlag::Edit => self.allow_edit,
            ObjectFlag::Delete => self.allow_delete,
            ObjectFlag::ViewAll => self.view_all_records,
            ObjectFlag::ModifyAll => self.modify_all_records,
        }
    }

    pub fn set(&mut self, flag: ObjectFlag, value: bool) {
        match flag {
            ObjectFlag::Read => self.allow_read = value,
            ObjectFlag::Create => self.allow_create = value,
            ObjectFlag::Edit => self.allow_edit = value,
            ObjectFlag::Delete => self.allow_delete = value,
            ObjectFlag::ViewAll => self.view_all_records = value,
            ObjectFlag::ModifyAll => self.modify_all_records = value,
        }
    }

    /// Flags set on every snapshot. No snapshots means no flags.
    pub fn common(snapshots: &[Self]) -> Self {
        let Some((first, rest)) = snapshots.split_first() else {
            return Self::default();
        };
        rest.iter().fold(*first, |acc, flags| {
            let mut out = acc;
            for flag in ObjectFlag::ALL {
                out.set(flag, acc.get(flag) && flags.get(flag));
            }
            out
        })
    }

    /// Flags set on at least one snapshot.
    pub fn any(snapshots: &[Self]) -> Self {
        snapshots.iter().fold(Self::default(), |acc, flags| {
            let mut out = acc;
            for flag in ObjectFlag::ALL {
                out.set(flag, acc.get(flag) || flags.get(flag));
            }
            out
        })
    }

    pub fn granted(&self) -> Vec<ObjectFlag> {
        ObjectFlag::ALL
            .into_iter()
            .filter(|flag| self.get(*flag))
            .collect()
    }

    /// Element/value pairs in metadata file order (the `object` key element excluded).
    pub fn xml_fields(&self) -> [(&'static str, bool); 6] {
        [
            ("allowCreate", self.allow_create),
            ("allowDelete", self.allow_delete),
            ("allowEdit", self.allow_edit),
            ("allowRead", self.allow_read),
            ("modifyAllRecords", self.modify_all_records),
            ("viewAllRecords", self.view_all_records),
        ]
    }

    /// Read flags back from metadata element values; missing elements count as `false`.
    pub fn from_xml_fields<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut flags = Self::default();
        for (name, value) in fields {
            let on = value.trim() == "true";
            match name {
                "allowCreate" => flags.allow_create = on,
                "allowDelete" => flags.allow_delete = on,
                "allowEdit" => flags.allow_edit = on,
                "allowRead" => flags.allow_read = on,
                "modifyAllRecords" => flags.modify_all_records = on,
                "viewAllRecords" => flags.view_all_records = on,
                _ => {}
            }
        }
        flags
    }
}

/// Read/edit flags for one field on one permission container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPermissionFlags {
    pub readable: bool,
    pub editable: bool,
}

impl FieldPermissionFlags {
    /// Apply implication rules. Idempotent.
    pub fn normalize(self) -> Self {
        let mut flags = self;
        if flags.editable {
            flags.readable = true;
        }
        flags
    }

    pub fn from_record(record: &FieldPermissionsRecord) -> Self {
        Self {
            readable: record.permissions_read,
            editable: record.permissions_edit,
        }
    }

    pub fn get(&self, flag: FieldFlag) -> bool {
        match flag {
            FieldFlag::Read => self.readable,
            FieldFlag::Edit => self.editable,
        }
    }

    pub fn set(&mut self, flag: FieldFlag, value: bool) {
        match flag {
            FieldFlag::Read => self.readable = value,
            FieldFlag::Edit => self.editable = value,
        }
    }

    /// Flags set on every snapshot. No snapshots means no flags.
    pub fn common(snapshots: &[Self]) -> Self {
        match snapshots.split_first() {
            Some((first, rest)) => rest.iter().fold(*first, |acc, flags| Self {
                readable: acc.readable && flags.readable,
                editable: acc.editable && flags.editable,
            }),
            None => Self::default(),
        }
    }

    /// Flags set on at least one snapshot.
    pub fn any(snapshots: &[Self]) -> Self {
        snapshots.iter().fold(Self::default(), |acc, flags| Self {
            readable: acc.readable || flags.readable,
            editable: acc.editable || flags.editable,
        })
    }

    pub fn granted(&self) -> Vec<FieldFlag> {
        FieldFlag::ALL
            .into_iter()
            .filter(|flag| self.get(*flag))
            .collect()
    }

    pub fn xml_fields(&self) -> [(&'static str, bool); 2] {
        [("editable", self.editable), ("readable", self.readable)]
    }

    pub fn from_xml_fields<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut flags = Self::default();
        for (name, value) in fields {
            let on = value.trim() == "true";
            match name {
                "editable" => flags.editable = on,
                "readable" => flags.readable = on,
                _ => {}
            }
        }
        flags
    }
}

/// Requested change to an object's flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectFlagUpdate {
    changes: Vec<(ObjectFlag, bool)>,
}

impl ObjectFlagUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, flag: ObjectFlag) -> Self {
        self.changes.push((flag, true));
        self
    }

    pub fn revoke(mut self, flag: ObjectFlag) -> Self {
        self.changes.push((flag, false));
        self
    }

    /// Changes between the flags a prompt started with and what the user left selected.
    /// Newly checked flags are granted, unchecked ones revoked, everything else is kept.
    pub fn from_selection(initial: &[ObjectFlag], selected: &[ObjectFlag]) -> Self {
        ObjectFlag::ALL.into_iter().fold(Self::new(), |update, flag| {
            match (initial.contains(&flag), selected.contains(&flag)) {
                (false, true) => update.grant(flag),
                (true, false) => update.revoke(flag),
                _ => update,
            }
        })
    }

    pub fn from_lists(grant: &[ObjectFlag], revoke: &[ObjectFlag]) -> Self {
        let update = grant.iter().fold(Self::new(), |u, f| u.grant(*f));
        revoke.iter().fold(update, |u, f| u.revoke(*f))
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Merge this update over an existing snapshot and normalize the result.
    pub fn apply(&self, existing: ObjectPermissionFlags) -> ObjectPermissionFlags {
        let mut flags = existing;
        let mut revoked = Vec::new();
        for (flag, value) in &self.changes {
            flags.set(*flag, *value);
            if !value {
                revoked.push(*flag);
            }
        }

        // Clear transitive implicants of every revoked flag.
        while let Some(flag) = revoked.pop() {
            for implicant in flag.implied_by() {
                if flags.get(*implicant) {
                    flags.set(*implicant, false);
                }
                revoked.push(*implicant);
            }
        }

        flags.normalize()
    }
}

/// Requested change to a field's flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFlagUpdate {
    pub readable: Option<bool>,
    pub editable: Option<bool>,
}

impl FieldFlagUpdate {
    /// See [`ObjectFlagUpdate::from_selection`].
    pub fn from_selection(initial: &[FieldFlag], selected: &[FieldFlag]) -> Self {
        let mut update = Self::default();
        for flag in FieldFlag::ALL {
            match (initial.contains(&flag), selected.contains(&flag)) {
                (false, true) => update.set(flag, true),
                (true, false) => update.set(flag, false),
                _ => {}
            }
        }
        update
    }

    pub fn from_lists(grant: &[FieldFlag], revoke: &[FieldFlag]) -> Self {
        let mut update = Self::default();
        for flag in grant {
            update.set(*flag, true);
        }
        for flag in revoke {
            update.set(*flag, false);
        }
        update
    }

    fn set(&mut self, flag: FieldFlag, value: bool) {
        match flag {
            FieldFlag::Read => self.readable = Some(value),
            FieldFlag::Edit => self.editable = Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.readable.is_none() && self.editable.is_none()
    }

    pub fn apply(&self, existing: FieldPermissionFlags) -> FieldPermissionFlags {
        let mut flags = existing;
        if let Some(editable) = self.editable {
            flags.editable = editable;
        }
        if let Some(readable) = self.readable {
            flags.readable = readable;
            if !readable {
                flags.editable = false;
            }
        }
        flags.normalize()
    }
}
