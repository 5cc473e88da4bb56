//! Object and field permission edits against a scripted CLI

use serde_json::json;
use sfkit::error::SfkitError;
use sfkit::metadata::MetadataDocument;
use sfkit::permissions::{
    FieldEdit, FieldFlag, FieldFlagUpdate, ObjectEdit, ObjectFlag, ObjectFlagUpdate,
    ObjectPermissionFlags, PermissionEditor, PermissionTarget, TargetStatus,
};
use std::fs;

use crate::integration::test_utils::{
    arg_value, field_row, object_block, object_row, operation_result, permission_set_xml,
    ScriptedCli, TestWorkspace, PERMISSION_SET_DIR, PROFILE_DIR,
};

fn sales() -> PermissionTarget {
    PermissionTarget::PermissionSet {
        id: "0PS000000000001".to_string(),
        name: "Sales".to_string(),
        label: Some("Sales".to_string()),
        namespace_prefix: None,
    }
}

fn ops() -> PermissionTarget {
    PermissionTarget::PermissionSet {
        id: "0PS000000000002".to_string(),
        name: "Ops".to_string(),
        label: None,
        namespace_prefix: None,
    }
}

fn admin_profile() -> PermissionTarget {
    PermissionTarget::Profile {
        id: "00e000000000001".to_string(),
        name: "Admin".to_string(),
        permission_set_id: "0PS000000000009".to_string(),
    }
}

fn scripted_deploys(cli: &ScriptedCli) {
    cli.respond(
        |args| args.starts_with(&["project".to_string(), "deploy".to_string()]),
        |args| {
            let dir = arg_value(args, "--source-dir").unwrap_or_default().to_string();
            Ok(json!({ "status": "Succeeded", "success": true, "files": [
                { "fullName": "x", "type": "PermissionSet", "state": "Changed", "filePath": dir }
            ]}))
        },
    );
}

#[tokio::test]
async fn grant_edit_merges_with_org_state_and_deploys() {
    let ws = TestWorkspace::new();
    let file = ws.write_permission_set("Sales", &object_block("Account", true, false));
    let cli = ScriptedCli::new();
    cli.on_query(
        "FROM ObjectPermissions",
        vec![object_row("0PS000000000001", "Account", [true, true, false, false, false, false])],
    );
    scripted_deploys(&cli);
    let session = ws.session(cli.clone());

    let report = PermissionEditor::new(&session)
        .edit_object(&ObjectEdit {
            object: "Account".to_string(),
            targets: vec![sales()],
            update: ObjectFlagUpdate::new().grant(ObjectFlag::Edit),
            deploy: true,
        })
        .await
        .unwrap();

    assert_eq!(report.failed_count(), 0);
    assert!(matches!(
        report.outcomes[0].status,
        TargetStatus::Updated { deployed: true, .. }
    ));

    let flags = MetadataDocument::load(&file)
        .unwrap()
        .object_permissions("Account")
        .unwrap()
        .unwrap();
    assert!(flags.allow_read && flags.allow_edit);
    assert!(flags.allow_create, "org state is the merge base");
    assert!(!flags.allow_delete);

    let deploys = cli.calls_to(&["project", "deploy", "start"]);
    assert_eq!(deploys.len(), 1);
    assert_eq!(
        arg_value(&deploys[0], "--source-dir"),
        Some(format!("{}/Sales.permissionset-meta.xml", PERMISSION_SET_DIR).as_str())
    );
    assert_eq!(arg_value(&deploys[0], "--target-org"), Some("test-org"));
}

#[tokio::test]
async fn snapshot_query_covers_all_targets_in_one_call() {
    let ws = TestWorkspace::new();
    ws.write_permission_set("Sales", "");
    ws.write_permission_set("Ops", "");
    let cli = ScriptedCli::new();
    cli.on_query("FROM ObjectPermissions", vec![]);
    let session = ws.session(cli.clone());

    PermissionEditor::new(&session)
        .edit_object(&ObjectEdit {
            object: "Contact".to_string(),
            targets: vec![sales(), ops()],
            update: ObjectFlagUpdate::new().grant(ObjectFlag::Read),
            deploy: false,
        })
        .await
        .unwrap();

    let queries = cli.calls_to(&["data", "query"]);
    assert_eq!(queries.len(), 1);
    let soql = arg_value(&queries[0], "--query").unwrap();
    assert!(soql.contains("SobjectType = 'Contact'"));
    assert!(soql.contains("'0PS000000000001'") && soql.contains("'0PS000000000002'"));
}

#[tokio::test]
async fn no_deploy_writes_locally_only() {
    let ws = TestWorkspace::new();
    let file = ws.write_permission_set("Sales", "");
    let cli = ScriptedCli::new();
    cli.on_query("FROM ObjectPermissions", vec![]);
    let session = ws.session(cli.clone());

    let report = PermissionEditor::new(&session)
        .edit_object(&ObjectEdit {
            object: "Invoice__c".to_string(),
            targets: vec![sales()],
            update: ObjectFlagUpdate::new().grant(ObjectFlag::ModifyAll),
            deploy: false,
        })
        .await
        .unwrap();

    assert!(matches!(
        report.outcomes[0].status,
        TargetStatus::Updated { deployed: false, .. }
    ));
    assert!(cli.calls_to(&["project", "deploy"]).is_empty());

    let flags = MetadataDocument::load(&file)
        .unwrap()
        .object_permissions("Invoice__c")
        .unwrap()
        .unwrap();
    assert!(flags.modify_all_records && flags.allow_edit && flags.allow_read);
}

#[tokio::test]
async fn deploy_after_edit_can_be_disabled_in_config() {
    let ws = TestWorkspace::new().with_config("[metadata]\ndeploy_after_edit = false\n");
    ws.write_permission_set("Sales", "");
    let cli = ScriptedCli::new();
    cli.on_query("FROM ObjectPermissions", vec![]);
    let session = ws.session(cli.clone());

    PermissionEditor::new(&session)
        .edit_object(&ObjectEdit {
            object: "Account".to_string(),
            targets: vec![sales()],
            update: ObjectFlagUpdate::new().grant(ObjectFlag::Read),
            deploy: true,
        })
        .await
        .unwrap();
    assert!(cli.calls_to(&["project", "deploy"]).is_empty());
}

#[tokio::test]
async fn revoking_read_clears_everything_that_implies_it() {
    let ws = TestWorkspace::new();
    let file = ws.write_permission_set("Sales", "");
    let cli = ScriptedCli::new();
    cli.on_query(
        "FROM ObjectPermissions",
        vec![object_row("0PS000000000001", "Account", [true, true, true, true, true, true])],
    );
    let session = ws.session(cli.clone());

    PermissionEditor::new(&session)
        .edit_object(&ObjectEdit {
            object: "Account".to_string(),
            targets: vec![sales()],
            update: ObjectFlagUpdate::new().revoke(ObjectFlag::Read),
            deploy: false,
        })
        .await
        .unwrap();

    let flags = MetadataDocument::load(&file)
        .unwrap()
        .object_permissions("Account")
        .unwrap()
        .unwrap();
    assert!(!flags.allow_read && !flags.allow_edit);
    assert!(!flags.view_all_records && !flags.modify_all_records);
    assert!(flags.allow_create && flags.allow_delete);
}

#[tokio::test]
async fn unchanged_entry_is_not_rewritten_or_deployed() {
    let ws = TestWorkspace::new();
    let file = ws.write_permission_set("Sales", &object_block("Account", true, true));
    let before = fs::read_to_string(&file).unwrap();
    let cli = ScriptedCli::new();
    cli.on_query(
        "FROM ObjectPermissions",
        vec![object_row("0PS000000000001", "Account", [true, false, true, false, false, false])],
    );
    let session = ws.session(cli.clone());

    let report = PermissionEditor::new(&session)
        .edit_object(&ObjectEdit {
            object: "Account".to_string(),
            targets: vec![sales()],
            update: ObjectFlagUpdate::new().grant(ObjectFlag::Edit),
            deploy: true,
        })
        .await
        .unwrap();

    assert!(matches!(report.outcomes[0].status, TargetStatus::Unchanged { .. }));
    assert_eq!(fs::read_to_string(&file).unwrap(), before);
    assert!(cli.calls_to(&["project", "deploy"]).is_empty());
}

#[tokio::test]
async fn missing_profile_file_is_retrieved_first() {
    let ws = TestWorkspace::new();
    let root = ws.root();
    let cli = ScriptedCli::new();
    cli.on_query("FROM ObjectPermissions", vec![]);
    let retrieved = root.join(PROFILE_DIR).join("Admin.profile-meta.xml");
    let target_file = retrieved.clone();
    cli.respond(
        |args| args.starts_with(&["project".to_string(), "retrieve".to_string()]),
        move |args| {
            assert_eq!(arg_value(args, "--metadata"), Some("Profile:Admin"));
            fs::create_dir_all(target_file.parent().unwrap()).unwrap();
            fs::write(
                &target_file,
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Profile xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    <custom>false</custom>\n    <userLicense>Salesforce</userLicense>\n</Profile>\n",
            )
            .unwrap();
            Ok(operation_result(&[("Profile", "Admin", target_file.as_path())]))
        },
    );
    let session = ws.session(cli.clone());

    let report = PermissionEditor::new(&session)
        .edit_object(&ObjectEdit {
            object: "Account".to_string(),
            targets: vec![admin_profile()],
            update: ObjectFlagUpdate::new().grant(ObjectFlag::Read),
            deploy: false,
        })
        .await
        .unwrap();

    assert_eq!(report.failed_count(), 0);
    let soql = arg_value(&cli.calls_to(&["data", "query"])[0], "--query")
        .unwrap()
        .to_string();
    assert!(soql.contains("'0PS000000000009'"), "profile edits query the owned permission set");

    let xml = fs::read_to_string(&retrieved).unwrap();
    assert!(xml.contains("<allowRead>true</allowRead>"));
    let custom_at = xml.find("<custom>").unwrap();
    let object_at = xml.find("<objectPermissions>").unwrap();
    let license_at = xml.find("<userLicense>").unwrap();
    assert!(custom_at < object_at && object_at < license_at);
}

#[tokio::test]
async fn one_failing_target_does_not_stop_the_others() {
    let ws = TestWorkspace::new();
    let sales_file = ws.write_permission_set("Sales", "");
    let cli = ScriptedCli::new();
    cli.on_query("FROM ObjectPermissions", vec![]);
    cli.fail(&["project", "retrieve"], "PermissionSet Ops not found in org");
    let session = ws.session(cli.clone());

    let report = PermissionEditor::new(&session)
        .edit_object(&ObjectEdit {
            object: "Account".to_string(),
            targets: vec![ops(), sales()],
            update: ObjectFlagUpdate::new().grant(ObjectFlag::Read),
            deploy: false,
        })
        .await
        .unwrap();

    assert!(report.outcomes[0].failed());
    assert!(!report.outcomes[1].failed());
    assert!(MetadataDocument::load(&sales_file)
        .unwrap()
        .object_permissions("Account")
        .unwrap()
        .is_some());

    match report.into_result() {
        Err(SfkitError::PartialFailure { failed, total, report }) => {
            assert_eq!((failed, total), (1, 2));
            assert!(report.contains("Ops"));
        }
        other => panic!("expected partial failure, got {:?}", other),
    }
}

#[tokio::test]
async fn snapshot_failure_aborts_before_touching_files() {
    let ws = TestWorkspace::new();
    let file = ws.write_permission_set("Sales", "");
    let before = fs::read_to_string(&file).unwrap();
    let cli = ScriptedCli::new();
    cli.fail_query("FROM ObjectPermissions", "INVALID_SESSION_ID");
    let session = ws.session(cli.clone());

    let err = PermissionEditor::new(&session)
        .edit_object(&ObjectEdit {
            object: "Account".to_string(),
            targets: vec![sales()],
            update: ObjectFlagUpdate::new().grant(ObjectFlag::Read),
            deploy: true,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, SfkitError::CliFailed { .. }));
    assert!(err.to_string().contains("INVALID_SESSION_ID"));
    assert_eq!(fs::read_to_string(&file).unwrap(), before);
}

#[tokio::test]
async fn field_read_injects_object_read_when_missing() {
    let ws = TestWorkspace::new();
    let file = ws.write_permission_set("Sales", "");
    let cli = ScriptedCli::new();
    cli.on_query("FROM FieldPermissions", vec![]);
    cli.on_query("FROM ObjectPermissions", vec![]);
    let session = ws.session(cli.clone());

    let report = PermissionEditor::new(&session)
        .edit_field(&FieldEdit {
            object: "Account".to_string(),
            field: "Account.Industry".to_string(),
            targets: vec![sales()],
            update: FieldFlagUpdate::from_lists(&[FieldFlag::Edit], &[]),
            deploy: false,
        })
        .await
        .unwrap();

    assert!(report.outcomes[0].injected_object_read);
    let doc = MetadataDocument::load(&file).unwrap();
    let field = doc.field_permissions("Account.Industry").unwrap().unwrap();
    assert!(field.readable && field.editable);
    let object = doc.object_permissions("Account").unwrap().unwrap();
    assert!(object.allow_read);
    assert!(!object.allow_edit);

    let xml = fs::read_to_string(&file).unwrap();
    assert!(xml.find("<fieldPermissions>").unwrap() < xml.find("<label>").unwrap());
    assert!(xml.find("<label>").unwrap() < xml.find("<objectPermissions>").unwrap());
}

#[tokio::test]
async fn field_edit_keeps_existing_object_read() {
    let ws = TestWorkspace::new();
    let file = ws.write_permission_set("Sales", &object_block("Account", true, true));
    let cli = ScriptedCli::new();
    cli.on_query(
        "FROM FieldPermissions",
        vec![field_row("0PS000000000001", "Account.Industry", true, false)],
    );
    cli.on_query(
        "FROM ObjectPermissions",
        vec![object_row("0PS000000000001", "Account", [true, false, true, false, false, false])],
    );
    let session = ws.session(cli.clone());

    let report = PermissionEditor::new(&session)
        .edit_field(&FieldEdit {
            object: "Account".to_string(),
            field: "Account.Industry".to_string(),
            targets: vec![sales()],
            update: FieldFlagUpdate::from_lists(&[FieldFlag::Edit], &[]),
            deploy: false,
        })
        .await
        .unwrap();

    assert!(!report.outcomes[0].injected_object_read);
    let xml = fs::read_to_string(&file).unwrap();
    assert_eq!(xml.matches("<objectPermissions>").count(), 1);
    assert!(xml.contains("<allowEdit>true</allowEdit>"));
    assert!(xml.contains("<field>Account.Industry</field>"));
}

#[tokio::test]
async fn revoking_field_read_clears_edit() {
    let ws = TestWorkspace::new();
    let body = "    <fieldPermissions>\n        <editable>true</editable>\n        <field>Account.Industry</field>\n        <readable>true</readable>\n    </fieldPermissions>\n";
    let file = ws.write(
        &format!("{}/Sales.permissionset-meta.xml", PERMISSION_SET_DIR),
        &permission_set_xml("Sales", body),
    );
    let cli = ScriptedCli::new();
    cli.on_query(
        "FROM FieldPermissions",
        vec![field_row("0PS000000000001", "Account.Industry", true, true)],
    );
    cli.on_query("FROM ObjectPermissions", vec![]);
    let session = ws.session(cli.clone());

    PermissionEditor::new(&session)
        .edit_field(&FieldEdit {
            object: "Account".to_string(),
            field: "Account.Industry".to_string(),
            targets: vec![sales()],
            update: FieldFlagUpdate::from_lists(&[], &[FieldFlag::Read]),
            deploy: false,
        })
        .await
        .unwrap();

    let doc = MetadataDocument::load(&file).unwrap();
    let field = doc.field_permissions("Account.Industry").unwrap().unwrap();
    assert!(!field.readable && !field.editable);
    assert!(
        doc.object_permissions("Account").unwrap().is_none(),
        "no object read is injected for an unreadable field"
    );
}

#[tokio::test]
async fn empty_update_is_rejected_without_org_calls() {
    let ws = TestWorkspace::new();
    let cli = ScriptedCli::new();
    let session = ws.session(cli.clone());

    let err = PermissionEditor::new(&session)
        .edit_object(&ObjectEdit {
            object: "Account".to_string(),
            targets: vec![sales()],
            update: ObjectFlagUpdate::new(),
            deploy: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SfkitError::InvalidInput(_)));
    assert!(cli.calls().is_empty());
}

#[tokio::test]
async fn field_read_injects_object_read_when_file_lacks_it_but_org_has_it() {
    let ws = TestWorkspace::new();
    let file = ws.write_permission_set("Sales", &object_block("Account", false, false));
    let cli = ScriptedCli::new();
    cli.on_query("FROM FieldPermissions", vec![]);
    cli.on_query(
        "FROM ObjectPermissions",
        vec![object_row("0PS000000000001", "Account", [true, false, false, false, false, false])],
    );
    let session = ws.session(cli.clone());

    let report = PermissionEditor::new(&session)
        .edit_field(&FieldEdit {
            object: "Account".to_string(),
            field: "Account.Industry".to_string(),
            targets: vec![sales()],
            update: FieldFlagUpdate::from_lists(&[FieldFlag::Read], &[]),
            deploy: false,
        })
        .await
        .unwrap();

    assert!(report.outcomes[0].injected_object_read);
    let doc = MetadataDocument::load(&file).unwrap();
    assert!(doc.object_permissions("Account").unwrap().unwrap().allow_read);
    assert!(doc.field_permissions("Account.Industry").unwrap().unwrap().readable);
    let xml = fs::read_to_string(&file).unwrap();
    assert_eq!(xml.matches("<objectPermissions>").count(), 1);
    assert!(!xml.contains("<allowRead>false</allowRead>"));
}

#[tokio::test]
async fn prompted_selection_keeps_flags_that_differ_between_targets() {
    let ws = TestWorkspace::new();
    let sales_file = ws.write_permission_set("Sales", "");
    let ops_file = ws.write_permission_set("Ops", "");
    let cli = ScriptedCli::new();
    cli.on_query(
        "FROM ObjectPermissions",
        vec![
            // read + delete
            object_row("0PS000000000001", "Account", [true, false, false, true, false, false]),
            // read + create
            object_row("0PS000000000002", "Account", [true, true, false, false, false, false]),
        ],
    );
    let session = ws.session(cli.clone());

    let states = [
        ObjectPermissionFlags {
            allow_read: true,
            allow_delete: true,
            ..Default::default()
        },
        ObjectPermissionFlags {
            allow_read: true,
            allow_create: true,
            ..Default::default()
        },
    ];
    let initial = ObjectPermissionFlags::common(&states).granted();
    assert_eq!(initial, vec![ObjectFlag::Read]);
    let update = ObjectFlagUpdate::from_selection(&initial, &[ObjectFlag::Read, ObjectFlag::Edit]);

    PermissionEditor::new(&session)
        .edit_object(&ObjectEdit {
            object: "Account".to_string(),
            targets: vec![sales(), ops()],
            update,
            deploy: false,
        })
        .await
        .unwrap();

    let sales_flags = MetadataDocument::load(&sales_file)
        .unwrap()
        .object_permissions("Account")
        .unwrap()
        .unwrap();
    assert_eq!(
        sales_flags.granted(),
        vec![ObjectFlag::Read, ObjectFlag::Edit, ObjectFlag::Delete]
    );
    let ops_flags = MetadataDocument::load(&ops_file)
        .unwrap()
        .object_permissions("Account")
        .unwrap()
        .unwrap();
    assert_eq!(
        ops_flags.granted(),
        vec![ObjectFlag::Read, ObjectFlag::Create, ObjectFlag::Edit]
    );
}
