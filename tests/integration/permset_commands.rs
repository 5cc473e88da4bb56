//! Permission set create/delete/assign against a mock org

use mockito::Matcher;
use serde_json::json;
use sfkit::error::SfkitError;
use sfkit::permset::{self, Assignment, CreateRequest};
use sfkit::refresh::refresh;
use std::sync::Arc;

use crate::integration::test_utils::{
    arg_value, operation_result, ScriptedCli, TestWorkspace, PERMISSION_SET_DIR,
};

fn org_display(cli: &ScriptedCli, instance_url: &str) {
    cli.on(
        &["org", "display"],
        json!({
            "instanceUrl": instance_url,
            "accessToken": "00Dxx!token",
            "apiVersion": "62.0",
            "username": "admin@acme.test",
            "alias": "test-org"
        }),
    );
}

fn seeded_cache(cli: &ScriptedCli) {
    cli.on_query("FROM Profile ORDER BY Name", vec![]);
    cli.on_query("IsOwnedByProfile = true", vec![]);
    cli.on_query(
        "IsOwnedByProfile = false",
        vec![json!({
            "Id": "0PS000000000001", "Name": "Sales_Ops", "Label": "Sales Ops",
            "IsOwnedByProfile": false
        })],
    );
}

#[tokio::test]
async fn create_posts_to_rest_api_and_retrieves_source() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/services/data/v62.0/sobjects/PermissionSet")
        .match_header("authorization", "Bearer 00Dxx!token")
        .match_body(Matcher::PartialJson(json!({
            "Label": "Invoice Admin",
            "Name": "Invoice_Admin",
            "HasActivationRequired": false
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"0PS000000000010","success":true,"errors":[]}"#)
        .create_async()
        .await;

    let ws = TestWorkspace::new();
    let cli = ScriptedCli::new();
    org_display(&cli, &server.url());
    seeded_cache(&cli);
    let retrieved = ws.root().join(PERMISSION_SET_DIR).join("Invoice_Admin.permissionset-meta.xml");
    cli.on(
        &["project", "retrieve", "start"],
        operation_result(&[("PermissionSet", "Invoice_Admin", retrieved.as_path())]),
    );
    let session = ws.session(cli.clone());
    refresh(&session).await.unwrap();

    let created = permset::create(
        &session,
        &CreateRequest {
            label: "Invoice Admin".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    mock.assert_async().await;
    assert_eq!(created.id, "0PS000000000010");
    assert_eq!(created.name, "Invoice_Admin");
    assert_eq!(created.file.as_deref(), Some(retrieved.as_path()));

    let retrieves = cli.calls_to(&["project", "retrieve", "start"]);
    assert_eq!(arg_value(&retrieves[0], "--metadata"), Some("PermissionSet:Invoice_Admin"));

    let cached = session.snapshot().unwrap().unwrap();
    assert!(cached.permission_set("Invoice Admin").is_some());
    assert!(cached.permission_set("Sales_Ops").is_some());
}

#[tokio::test]
async fn rejected_create_surfaces_salesforce_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/services/data/v62.0/sobjects/PermissionSet")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"message":"Duplicate Name","errorCode":"DUPLICATE_DEVELOPER_NAME","fields":[]}]"#)
        .create_async()
        .await;

    let ws = TestWorkspace::new();
    let cli = ScriptedCli::new();
    org_display(&cli, &server.url());
    let session = ws.session(cli.clone());

    let err = permset::create(
        &session,
        &CreateRequest {
            label: "Sales Ops".to_string(),
            name: Some("Sales_Ops".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();

    mock.assert_async().await;
    match err {
        SfkitError::RestRejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "DUPLICATE_DEVELOPER_NAME: Duplicate Name");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(cli.calls_to(&["project", "retrieve"]).is_empty());
}

#[tokio::test]
async fn config_api_version_overrides_org_version() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/services/data/v59.0/sobjects/PermissionSet")
        .with_status(201)
        .with_body(r#"{"id":"0PS000000000011","success":true,"errors":[]}"#)
        .create_async()
        .await;

    let ws = TestWorkspace::new().with_config(
        "[org]\napi_version = \"59.0\"\n\n[metadata]\nretrieve_after_create = false\n",
    );
    let cli = ScriptedCli::new();
    org_display(&cli, &server.url());
    let session = ws.session(cli.clone());

    let created = permset::create(
        &session,
        &CreateRequest {
            label: "Field Service".to_string(),
            description: Some("Dispatch".to_string()),
            activation_required: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    mock.assert_async().await;
    assert_eq!(created.file, None);
    assert!(cli.calls_to(&["project", "retrieve"]).is_empty());
}

#[tokio::test]
async fn delete_removes_org_component_and_local_files() {
    let ws = TestWorkspace::new();
    let local = ws.write_permission_set("Sales_Ops", "");
    let other = ws.write("unpackaged/permissionsets/sales_ops.permissionset-meta.xml", "<PermissionSet/>");
    let kept = ws.write_permission_set("Sales_Ops_Extra", "");
    let cli = ScriptedCli::new();
    seeded_cache(&cli);
    cli.on(&["project", "delete", "source"], operation_result(&[]));
    let session = ws.session(cli.clone());
    refresh(&session).await.unwrap();

    let deleted = permset::delete(&session, "Sales_Ops").await.unwrap();

    let calls = cli.calls_to(&["project", "delete", "source"]);
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains(&"--no-prompt".to_string()));
    assert_eq!(arg_value(&calls[0], "--metadata"), Some("PermissionSet:Sales_Ops"));
    assert_eq!(deleted.removed_files.len(), 2);
    assert!(!local.exists() && !other.exists());
    assert!(kept.exists());
    assert!(session.snapshot().unwrap().unwrap().permission_set("Sales_Ops").is_none());
}

#[tokio::test]
async fn failed_org_delete_keeps_local_files() {
    let ws = TestWorkspace::new();
    let local = ws.write_permission_set("Sales_Ops", "");
    let cli = ScriptedCli::new();
    cli.fail(&["project", "delete", "source"], "Cannot delete: assigned to users");
    let session = ws.session(cli);

    assert!(permset::delete(&session, "Sales_Ops").await.is_err());
    assert!(local.exists());
}

fn assignment_org(existing: bool) -> Arc<ScriptedCli> {
    let cli = ScriptedCli::new();
    cli.on_query(
        "WHERE Name = 'Sales_Ops'",
        vec![json!({ "Id": "0PS000000000001", "Name": "Sales_Ops", "Label": "Sales Ops" })],
    );
    cli.on_query(
        "FROM User WHERE Username = 'rep@acme.test'",
        vec![json!({ "Id": "005000000000002", "Username": "rep@acme.test" })],
    );
    cli.on(
        &["org", "display", "user"],
        json!({ "id": "005000000000001", "username": "admin@acme.test" }),
    );
    let rows = if existing {
        vec![json!({ "Id": "0Pa000000000001" })]
    } else {
        vec![]
    };
    cli.on_query("FROM PermissionSetAssignment", rows);
    cli.on(&["org", "assign", "permset"], json!({ "successes": [], "failures": [] }));
    cli
}

#[tokio::test]
async fn assign_to_current_user() {
    let ws = TestWorkspace::new();
    let cli = assignment_org(false);
    let session = ws.session(cli.clone());

    let assignment = permset::assign(&session, "Sales_Ops", None).await.unwrap();
    assert!(matches!(
        assignment,
        Assignment::Assigned { ref username, .. } if username == "admin@acme.test"
    ));

    let assignment_query = cli
        .calls_to(&["data", "query"])
        .into_iter()
        .find(|call| arg_value(call, "--query").unwrap().contains("PermissionSetAssignment"))
        .unwrap();
    assert!(arg_value(&assignment_query, "--query")
        .unwrap()
        .contains("AssigneeId = '005000000000001'"));

    let assigns = cli.calls_to(&["org", "assign", "permset"]);
    assert_eq!(arg_value(&assigns[0], "--name"), Some("Sales_Ops"));
    assert_eq!(arg_value(&assigns[0], "--on-behalf-of"), None);
}

#[tokio::test]
async fn assign_on_behalf_of_user() {
    let ws = TestWorkspace::new();
    let cli = assignment_org(false);
    let session = ws.session(cli.clone());

    permset::assign(&session, "Sales_Ops", Some("rep@acme.test"))
        .await
        .unwrap();
    let assigns = cli.calls_to(&["org", "assign", "permset"]);
    assert_eq!(arg_value(&assigns[0], "--on-behalf-of"), Some("rep@acme.test"));
    assert!(cli.calls_to(&["org", "display", "user"]).is_empty());
}

#[tokio::test]
async fn existing_assignment_is_not_repeated() {
    let ws = TestWorkspace::new();
    let cli = assignment_org(true);
    let session = ws.session(cli.clone());

    let assignment = permset::assign(&session, "Sales_Ops", None).await.unwrap();
    assert!(matches!(assignment, Assignment::AlreadyAssigned { .. }));
    assert!(cli.calls_to(&["org", "assign"]).is_empty());
}

#[tokio::test]
async fn unknown_permission_set_is_rejected() {
    let ws = TestWorkspace::new();
    let cli = ScriptedCli::new();
    cli.on_query("FROM PermissionSet WHERE Name", vec![]);
    let session = ws.session(cli.clone());

    let err = permset::assign(&session, "Nope", None).await.unwrap_err();
    assert!(matches!(err, SfkitError::UnknownTarget(ref name) if name == "Nope"));
    assert!(cli.calls_to(&["org", "assign"]).is_empty());
}
