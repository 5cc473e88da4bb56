//! Integration tests for layered configuration

use sfkit::config::{ConfigLoader, ConfigManager, SfkitConfig};
use sfkit::error::SfkitError;
use sfkit::session::{Session, SessionOptions};
use std::fs;
use tempfile::TempDir;

use crate::integration::test_utils::{ScriptedCli, TestWorkspace, XdgGuard};

fn write_global(test_dir: &TempDir, contents: &str) {
    let dir = test_dir.path().join("config").join("sfkit");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), contents).unwrap();
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let test_dir = TempDir::new().unwrap();
    let _guard = XdgGuard::new(&test_dir);
    write_global(
        &test_dir,
        "[refresh]\ninterval_minutes = 10\n\n[cli]\nbinary = \"/opt/sf/bin/sf\"\n",
    );
    let ws = TestWorkspace::new();
    ws.write(".sfkit/config.toml", "[refresh]\ninterval_minutes = 45\n");

    let config = ConfigLoader::load(&ws.root()).unwrap();
    assert_eq!(config.refresh.interval_minutes, 45);
    assert_eq!(config.cli.binary, "/opt/sf/bin/sf", "unset keys fall through to the global file");
    assert!(config.metadata.deploy_after_edit);
}

#[test]
fn test_environment_file_layers_over_workspace_file() {
    let test_dir = TempDir::new().unwrap();
    let _guard = XdgGuard::new(&test_dir);
    let ws = TestWorkspace::new();
    ws.write(
        ".sfkit/config.toml",
        "[metadata]\nretrieve_after_edit = false\n\n[org]\ntarget_org = \"dev\"\n",
    );
    ws.write(".sfkit/ci.toml", "[org]\ntarget_org = \"ci-scratch\"\n");

    std::env::set_var("SFKIT_ENV", "ci");
    let config = ConfigLoader::load(&ws.root()).unwrap();
    let files = ConfigLoader::config_files(&ws.root(), None);
    std::env::remove_var("SFKIT_ENV");

    assert_eq!(config.org.target_org.as_deref(), Some("ci-scratch"));
    assert!(!config.metadata.retrieve_after_edit);
    assert!(files.iter().any(|f| f.ends_with(".sfkit/ci.toml")));
}

#[test]
fn test_environment_variables_win_over_files() {
    let test_dir = TempDir::new().unwrap();
    let _guard = XdgGuard::new(&test_dir);
    let ws = TestWorkspace::new();
    ws.write(".sfkit/config.toml", "[refresh]\ninterval_minutes = 45\n");

    std::env::set_var("SFKIT__REFRESH__INTERVAL_MINUTES", "5");
    let config = ConfigLoader::load(&ws.root()).unwrap();
    std::env::remove_var("SFKIT__REFRESH__INTERVAL_MINUTES");

    assert_eq!(config.refresh.interval_minutes, 5);
}

#[test]
fn test_override_file_replaces_discovery() {
    let test_dir = TempDir::new().unwrap();
    let _guard = XdgGuard::new(&test_dir);
    write_global(&test_dir, "[cli]\nbinary = \"/opt/sf/bin/sf\"\n");
    let ws = TestWorkspace::new();
    ws.write(".sfkit/config.toml", "[refresh]\ninterval_minutes = 45\n");
    let override_file = ws.write("ci/sfkit.toml", "[metadata]\ndeploy_after_edit = false\n");

    let config = ConfigLoader::load_with_override(&ws.root(), Some(&override_file)).unwrap();
    assert!(!config.metadata.deploy_after_edit);
    assert_eq!(config.refresh.interval_minutes, 30);
    assert_eq!(config.cli.binary, "sf");
    assert_eq!(
        ConfigLoader::config_files(&ws.root(), Some(&override_file)),
        vec![override_file.clone()]
    );
}

#[test]
fn test_missing_override_file_is_an_error() {
    let ws = TestWorkspace::new();
    let missing = ws.root().join("nope.toml");
    assert!(ConfigLoader::load_with_override(&ws.root(), Some(&missing)).is_err());
}

#[test]
fn test_invalid_configuration_refuses_to_open_session() {
    let test_dir = TempDir::new().unwrap();
    let _guard = XdgGuard::new(&test_dir);
    let ws = TestWorkspace::new();
    ws.write(
        ".sfkit/config.toml",
        "[cli]\ntimeout_seconds = 0\n\n[logging]\nformat = \"yaml\"\n",
    );

    let result = Session::open(SessionOptions {
        workspace: Some(ws.root()),
        cli: Some(ScriptedCli::new()),
        cache_dir: Some(ws.root().join(".sfkit").join("cache")),
        ..Default::default()
    });
    match result {
        Err(SfkitError::ConfigError(message)) => {
            assert!(message.contains("timeout_seconds"));
            assert!(message.contains("yaml"));
        }
        Err(other) => panic!("expected a configuration error, got {}", other),
        Ok(_) => panic!("expected a configuration error"),
    }
}

#[test]
fn test_session_discovers_root_and_workspace_data_dir() {
    let test_dir = TempDir::new().unwrap();
    let _guard = XdgGuard::new(&test_dir);
    let ws = TestWorkspace::new();
    fs::create_dir_all(ws.root().join("force-app/main/default")).unwrap();

    let session = Session::open(SessionOptions {
        workspace: Some(ws.root().join("force-app/main/default")),
        cli: Some(ScriptedCli::new()),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(session.workspace_root(), ws.root().as_path());
    assert_eq!(session.project().name.as_deref(), Some("acme"));
    assert!(test_dir.path().join("data").join("sfkit").join("workspaces").is_dir());
}

#[test]
fn test_config_manager_keeps_last_good_config() {
    let test_dir = TempDir::new().unwrap();
    let _guard = XdgGuard::new(&test_dir);
    let ws = TestWorkspace::new();
    let file = ws.write(".sfkit/config.toml", "[refresh]\ninterval_minutes = 15\n");

    let initial = ConfigLoader::load(&ws.root()).unwrap();
    let manager = ConfigManager::new(initial, ws.root(), None);
    assert_eq!(manager.get().refresh.interval_minutes, 15);
    assert!(manager.watched_files().contains(&file));

    fs::write(&file, "[refresh]\ninterval_minutes = 20\n").unwrap();
    assert_eq!(manager.reload().unwrap().refresh.interval_minutes, 20);

    fs::write(&file, "[refresh]\ninterval_minutes = 100000\n").unwrap();
    assert!(manager.reload().is_err());
    assert_eq!(manager.get().refresh.interval_minutes, 20);
}

#[test]
fn test_shown_config_round_trips_through_loader() {
    let ws = TestWorkspace::new();
    let mut config = SfkitConfig::default();
    config.org.api_version = Some("61.0".to_string());
    config.metadata.retrieve_after_edit = true;
    let path = ws.write("shown.toml", &config.to_toml().unwrap());

    let reloaded = ConfigLoader::load_from_file(&path).unwrap();
    assert_eq!(reloaded.org.api_version.as_deref(), Some("61.0"));
    assert!(reloaded.metadata.retrieve_after_edit);
    assert_eq!(reloaded, config);
}
