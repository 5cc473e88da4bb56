//! Commands routed through `RunContext` with a scripted org

use clap::Parser;
use serde_json::{json, Value};
use sfkit::cli::{exit_code, show_config, Cli, RunContext};
use sfkit::error::SfkitError;
use std::sync::Arc;
use tempfile::TempDir;

use crate::integration::test_utils::{
    arg_value, object_row, ScriptedCli, TestWorkspace, XdgGuard, PERMISSION_SET_DIR,
};

fn scripted_org() -> Arc<ScriptedCli> {
    let cli = ScriptedCli::new();
    cli.on_query(
        "FROM Profile ORDER BY Name",
        vec![json!({ "Id": "00e000000000001", "Name": "Standard User" })],
    );
    cli.on_query(
        "IsOwnedByProfile = true",
        vec![json!({
            "Id": "0PS000000000091", "Name": "X00e1", "IsOwnedByProfile": true,
            "ProfileId": "00e000000000001", "Profile": { "Name": "Standard User" }
        })],
    );
    cli.on_query(
        "IsOwnedByProfile = false",
        vec![
            json!({ "Id": "0PS000000000002", "Name": "Ops", "Label": "Operations" }),
            json!({ "Id": "0PS000000000001", "Name": "Sales_Ops", "Label": "Sales Ops" }),
        ],
    );
    cli
}

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["sfkit"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

async fn run(ws: &TestWorkspace, cli: &Arc<ScriptedCli>, args: &[&str]) -> Result<String, SfkitError> {
    let parsed = parse(args);
    let context = RunContext::new(ws.options(cli.clone()), parsed.format.clone())?;
    context.execute(&parsed.command).await
}

#[tokio::test]
async fn perms_object_refreshes_empty_cache_and_reports_json() {
    let ws = TestWorkspace::new();
    ws.write_permission_set("Sales_Ops", "");
    let cli = scripted_org();
    cli.on_query(
        "FROM ObjectPermissions",
        vec![object_row("0PS000000000001", "Account", [true, false, false, false, false, false])],
    );

    let output = run(
        &ws,
        &cli,
        &[
            "perms", "object", "--object", "Account", "-t", "Sales Ops", "--grant", "edit",
            "--no-deploy", "--format", "json",
        ],
    )
    .await
    .unwrap();

    let report: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(report["subject"], "Account");
    let outcome = &report["outcomes"][0];
    assert_eq!(outcome["target"]["name"], "Sales_Ops");
    assert_eq!(outcome["status"]["status"], "updated");
    assert_eq!(outcome["status"]["deployed"], false);
    assert_eq!(outcome["object_flags"]["allow_edit"], true);
    assert_eq!(cli.calls_to(&["data", "query"]).len(), 4, "three refresh queries and one snapshot");
}

#[tokio::test]
async fn perms_field_from_path_edits_profile() {
    let ws = TestWorkspace::new();
    let field_file = ws.write(
        "force-app/main/default/objects/Account/fields/Industry.field-meta.xml",
        "<CustomField/>",
    );
    ws.write(
        "force-app/main/default/profiles/Standard User.profile-meta.xml",
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Profile xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    <custom>false</custom>\n</Profile>\n",
    );
    let cli = scripted_org();
    cli.on_query("FROM FieldPermissions", vec![]);
    cli.on_query("FROM ObjectPermissions", vec![]);
    let path = field_file.to_string_lossy().into_owned();

    let output = run(
        &ws,
        &cli,
        &[
            "perms", "field", "--path", &path, "-t", "profile:Standard User", "--grant", "read",
            "--no-deploy",
        ],
    )
    .await
    .unwrap();

    assert!(output.contains("Standard User"));
    let xml = ws.read("force-app/main/default/profiles/Standard User.profile-meta.xml");
    assert!(xml.contains("<field>Account.Industry</field>"));
    assert!(xml.contains("<object>Account</object>"));
    let soql = cli
        .calls_to(&["data", "query"])
        .into_iter()
        .filter_map(|call| arg_value(&call, "--query").map(str::to_string))
        .find(|q| q.contains("FROM FieldPermissions"))
        .unwrap();
    assert!(soql.contains("Field = 'Account.Industry'"));
    assert!(soql.contains("'0PS000000000091'"));
}

#[tokio::test]
async fn partial_failure_carries_rendered_report() {
    let ws = TestWorkspace::new();
    ws.write_permission_set("Sales_Ops", "");
    let cli = scripted_org();
    cli.on_query("FROM ObjectPermissions", vec![]);
    cli.fail(&["project", "retrieve"], "Entity of type 'PermissionSet' named 'Ops' cannot be found");

    let err = run(
        &ws,
        &cli,
        &["perms", "object", "--object", "Case", "-t", "Ops,Sales_Ops", "--grant", "read", "--no-deploy"],
    )
    .await;
    // `-t` takes one name per flag; a comma is part of the name.
    assert!(matches!(err, Err(SfkitError::UnknownTarget(_))));

    let err = run(
        &ws,
        &cli,
        &[
            "perms", "object", "--object", "Case", "-t", "Ops", "-t", "Sales_Ops", "--grant",
            "read", "--no-deploy",
        ],
    )
    .await
    .unwrap_err();
    match &err {
        SfkitError::PartialFailure { failed, total, report } => {
            assert_eq!((*failed, *total), (1, 2));
            assert!(report.contains("Sales_Ops"), "successful rows stay in the report");
            assert!(report.contains("cannot be found"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(exit_code(&err), 1);
}

#[tokio::test]
async fn permset_list_is_sorted_by_label() {
    let ws = TestWorkspace::new();
    let cli = scripted_org();

    let output = run(&ws, &cli, &["permset", "list", "--format", "json"]).await.unwrap();
    let sets: Value = serde_json::from_str(&output).unwrap();
    let labels: Vec<&str> = sets
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["Operations", "Sales Ops"]);

    let text = run(&ws, &cli, &["profile", "list"]).await.unwrap();
    assert!(text.contains("Standard User"));
    assert_eq!(cli.calls_to(&["data", "query"]).len(), 3, "second command reads the cache");
}

#[tokio::test]
async fn status_reports_project_and_cache() {
    let ws = TestWorkspace::new();
    let cli = scripted_org();
    run(&ws, &cli, &["refresh"]).await.unwrap();

    let output = run(&ws, &cli, &["status", "--format", "json"]).await.unwrap();
    let status: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(status["project_name"], "acme");
    assert_eq!(status["source_api_version"], "61.0");
    assert_eq!(status["target_org"], "test-org");
    assert_eq!(status["cache"]["permission_sets"], 2);
}

#[tokio::test]
async fn deploy_defaults_to_package_directory() {
    let ws = TestWorkspace::new();
    ws.write_permission_set("Sales_Ops", "");
    let cli = ScriptedCli::new();
    cli.on(
        &["project", "deploy", "start"],
        json!({ "status": "Succeeded", "success": true, "files": [] }),
    );

    let output = run(&ws, &cli, &["deploy"]).await.unwrap();
    assert!(output.contains("no components"));
    let deploys = cli.calls_to(&["project", "deploy", "start"]);
    assert_eq!(arg_value(&deploys[0], "--source-dir"), Some("force-app"));

    let relative = format!("{}/Sales_Ops.permissionset-meta.xml", PERMISSION_SET_DIR);
    let absolute = ws.root().join(&relative).to_string_lossy().into_owned();
    run(&ws, &cli, &["deploy", &absolute]).await.unwrap();
    let deploys = cli.calls_to(&["project", "deploy", "start"]);
    assert_eq!(arg_value(&deploys[1], "--source-dir"), Some(relative.as_str()));
}

#[test]
fn config_show_needs_no_org() {
    let test_dir = TempDir::new().unwrap();
    let _guard = XdgGuard::new(&test_dir);
    let ws = TestWorkspace::new();
    ws.write(".sfkit/config.toml", "[refresh]\ninterval_minutes = 7\n");
    let root = ws.root();

    let shown = show_config(Some(&root), None).unwrap();
    assert!(shown.contains("interval_minutes = 7"));

    let override_file = ws.write("other.toml", "[cli]\ntimeout_seconds = 0\n");
    let err = show_config(Some(&root), Some(&override_file)).unwrap_err();
    assert!(matches!(err, SfkitError::ConfigError(_)));
}
