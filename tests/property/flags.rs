//! Flag implication and update rules

use proptest::prelude::*;
use sfkit::permissions::{
    FieldFlag, FieldFlagUpdate, FieldPermissionFlags, ObjectFlag, ObjectFlagUpdate,
    ObjectPermissionFlags,
};

fn object_flags() -> impl Strategy<Value = ObjectPermissionFlags> {
    any::<[bool; 6]>().prop_map(|b| ObjectPermissionFlags {
        allow_read: b[0],
        allow_create: b[1],
        allow_edit: b[2],
        allow_delete: b[3],
        view_all_records: b[4],
        modify_all_records: b[5],
    })
}

fn object_flag() -> impl Strategy<Value = ObjectFlag> {
    prop::sample::select(ObjectFlag::ALL.to_vec())
}

fn field_flag() -> impl Strategy<Value = FieldFlag> {
    prop_oneof![Just(FieldFlag::Read), Just(FieldFlag::Edit)]
}

proptest! {
    #[test]
    fn normalize_is_idempotent_and_closed(flags in object_flags()) {
        let once = flags.normalize();
        prop_assert_eq!(once.normalize(), once);
        if once.modify_all_records {
            prop_assert!(once.allow_read && once.allow_edit);
        }
        if once.view_all_records || once.allow_edit {
            prop_assert!(once.allow_read);
        }
    }

    #[test]
    fn revoked_object_flags_stay_off(
        existing in object_flags(),
        grant in prop::collection::vec(object_flag(), 0..4),
        revoke in prop::collection::vec(object_flag(), 1..3),
    ) {
        let result = ObjectFlagUpdate::from_lists(&grant, &revoke).apply(existing);
        for flag in &revoke {
            prop_assert!(!result.get(*flag), "{:?} was revoked but is set", flag);
        }
        prop_assert_eq!(result.normalize(), result);
    }

    #[test]
    fn grants_without_revokes_are_all_set(
        existing in object_flags(),
        grant in prop::collection::vec(object_flag(), 1..6),
    ) {
        let result = ObjectFlagUpdate::from_lists(&grant, &[]).apply(existing);
        for flag in &grant {
            prop_assert!(result.get(*flag));
        }
        // Untouched flags keep their normalized value.
        let base = existing.normalize();
        for flag in ObjectFlag::ALL {
            if !grant.contains(&flag) && base.get(flag) {
                prop_assert!(result.get(flag));
            }
        }
    }

    #[test]
    fn selection_only_changes_toggled_flags(
        targets in prop::collection::vec(object_flags().prop_map(|f| f.normalize()), 1..4),
        selected in prop::collection::vec(object_flag(), 0..6),
    ) {
        let common = ObjectPermissionFlags::common(&targets);
        let initial = common.granted();
        let update = ObjectFlagUpdate::from_selection(&initial, &selected);
        for existing in &targets {
            let result = update.apply(*existing);
            for flag in ObjectFlag::ALL {
                let toggled_on = selected.contains(&flag) && !initial.contains(&flag);
                let toggled_off = initial.contains(&flag) && !selected.contains(&flag);
                if toggled_on || toggled_off {
                    continue;
                }
                // Untouched flags survive unless a revoke cascades over them.
                let cascaded = ObjectFlag::ALL.iter().any(|f| {
                    initial.contains(f) && !selected.contains(f)
                });
                if existing.get(flag) && !cascaded {
                    prop_assert!(result.get(flag), "{:?} was dropped", flag);
                }
            }
        }
    }

    #[test]
    fn field_updates_keep_edit_implying_read(
        readable in any::<bool>(),
        editable in any::<bool>(),
        grant in prop::collection::vec(field_flag(), 0..2),
        revoke in prop::collection::vec(field_flag(), 0..2),
    ) {
        let existing = FieldPermissionFlags { readable, editable };
        let result = FieldFlagUpdate::from_lists(&grant, &revoke).apply(existing);
        if result.editable {
            prop_assert!(result.readable);
        }
        for flag in &revoke {
            prop_assert!(!result.get(*flag));
        }
    }
}
