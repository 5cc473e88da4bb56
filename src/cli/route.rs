//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cache::OrgSnapshot;
use crate::cli::parse::{
    Commands, ConfigCommands, FieldFlagArg, LabelCommands, ObjectFlagArg, PackageCommands,
    PermsCommands, PermsetCommands, ProfileCommands, TargetArgs,
};
use crate::cli::presentation::{
    format_assignment, format_created, format_deleted, format_edit_report_text,
    format_label_written, format_operation_report, format_packages_text,
    format_permission_sets_text, format_permission_views_text, format_profiles_text,
    format_refresh_summary, format_version_result, to_json,
};
use crate::cli::progress::Spinner;
use crate::cli::{command_name, prompt};
use crate::config::{ConfigLoader, ConfigManager};
use crate::error::SfkitError;
use crate::labels::{self, LabelRequest};
use crate::metadata::{parse_metadata_path, MetadataRef};
use crate::names::label_to_developer_name;
use crate::org::deploy::{deploy_source, retrieve_components};
use crate::package::{self, VersionRequest};
use crate::permissions::edit::{field_snapshot, object_snapshot};
use crate::permissions::{
    resolve_targets, EditReport, FieldEdit, FieldFlag, FieldFlagUpdate, FieldPermissionFlags,
    ObjectEdit, ObjectFlag, ObjectFlagUpdate, ObjectPermissionFlags, PermissionEditor,
    PermissionTarget, PermissionView,
};
use crate::permset::{self, CreateRequest};
use crate::project::find_workspace_root;
use crate::refresh::{self, RefreshScheduler, RefreshTask, SessionRefresh};
use crate::session::{Session, SessionOptions};
use crate::workspace_status;
use notify::{RecursiveMode, Watcher};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Runtime context for CLI execution: the session and the output format.
pub struct RunContext {
    session: Arc<Session>,
    format: String,
}

impl RunContext {
    pub fn new(options: SessionOptions, format: impl Into<String>) -> Result<Self, SfkitError> {
        Ok(Self {
            session: Arc::new(Session::open(options)?),
            format: format.into(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn json(&self) -> bool {
        self.format == "json"
    }

    fn spinner(&self, message: &str) -> Spinner {
        Spinner::start(message, !self.json())
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, SfkitError> {
        let name = command_name(command);
        let started = Instant::now();
        let result = self
            .execute_inner(command)
            .instrument(info_span!("command", name = %name))
            .await;
        match &result {
            Ok(_) => info!(command = %name, elapsed_ms = started.elapsed().as_millis() as u64, "Command completed"),
            Err(e) => debug!(command = %name, error = %e, "Command failed"),
        }
        result
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, SfkitError> {
        match command {
            Commands::Refresh => self.handle_refresh().await,
            Commands::Watch => self.handle_watch().await,
            Commands::Status => {
                let status = workspace_status::collect(&self.session).await;
                if self.json() {
                    to_json(&status)
                } else {
                    Ok(workspace_status::format_status_text(&status))
                }
            }
            Commands::Perms { command } => self.handle_perms_command(command).await,
            Commands::Permset { command } => self.handle_permset_command(command).await,
            Commands::Profile { command } => match command {
                ProfileCommands::List { refresh } => {
                    let snapshot = self.snapshot(*refresh).await?;
                    let mut profiles = snapshot.profiles;
                    profiles.sort_by_key(|p| p.name.to_lowercase());
                    if self.json() {
                        to_json(&profiles)
                    } else {
                        Ok(format_profiles_text(&profiles))
                    }
                }
            },
            Commands::Label { command } => self.handle_label_command(command).await,
            Commands::Package { command } => self.handle_package_command(command).await,
            Commands::Deploy { paths } => self.handle_deploy(paths).await,
            Commands::Retrieve { components } => {
                let spinner = self.spinner("Retrieving metadata");
                let report = retrieve_components(&self.session, components).await;
                spinner.finish();
                let report = report?;
                if self.json() {
                    to_json(&report)
                } else {
                    Ok(format_operation_report("Retrieved", &report))
                }
            }
            Commands::Config { command } => match command {
                ConfigCommands::Show => self.session.config().to_toml(),
            },
        }
    }

    async fn handle_refresh(&self) -> Result<String, SfkitError> {
        let snapshot = self.refresh().await?;
        if self.json() {
            to_json(&snapshot)
        } else {
            Ok(format_refresh_summary(&snapshot))
        }
    }

    async fn refresh(&self) -> Result<OrgSnapshot, SfkitError> {
        let spinner = self.spinner("Refreshing profiles and permission sets");
        let result = refresh::refresh(&self.session).await;
        spinner.finish();
        result
    }

    /// Cached snapshot; refreshed first when asked or when nothing is cached.
    async fn snapshot(&self, force_refresh: bool) -> Result<OrgSnapshot, SfkitError> {
        if !force_refresh {
            if let Some(snapshot) = self.session.snapshot()? {
                return Ok(snapshot);
            }
            info!("Cache is empty, refreshing");
        }
        self.refresh().await
    }

    async fn handle_watch(&self) -> Result<String, SfkitError> {
        let manager = ConfigManager::new(
            self.session.config().clone(),
            self.session.workspace_root().to_path_buf(),
            self.session.config_file().map(Path::to_path_buf),
        );
        let task: Arc<dyn RefreshTask> = Arc::new(SessionRefresh::new(Arc::clone(&self.session)));

        if let Err(e) = task.run().await {
            warn!(error = %e, "Initial refresh failed");
        }

        let mut scheduler = RefreshScheduler::new(Arc::clone(&task));
        scheduler.reconfigure(manager.get().refresh.interval());

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<notify::Event>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => warn!(error = %e, "Config watch error"),
            }
        })
        .map_err(|e| SfkitError::ConfigError(format!("Failed to watch config files: {}", e)))?;

        let watched = manager.watched_files();
        let watched_names: HashSet<OsString> = watched
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
            .collect();
        let mut watched_dirs: Vec<&Path> = watched.iter().filter_map(|p| p.parent()).collect();
        watched_dirs.sort();
        watched_dirs.dedup();
        for dir in watched_dirs {
            if !dir.is_dir() {
                debug!(dir = %dir.display(), "Config directory missing, not watched");
                continue;
            }
            if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
                warn!(dir = %dir.display(), error = %e, "Cannot watch config directory");
            }
        }

        info!(
            interval_minutes = manager.get().refresh.interval_minutes,
            "Watching; press Ctrl+C to stop"
        );
        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        warn!(error = %e, "Cannot listen for Ctrl+C");
                    }
                    break;
                }
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    let relevant = event.paths.iter().any(|p| {
                        p.file_name().map(|n| watched_names.contains(n)).unwrap_or(false)
                    });
                    if !relevant {
                        continue;
                    }
                    match manager.reload() {
                        Ok(config) => {
                            let period = config.refresh.interval();
                            if period != scheduler.period() {
                                info!(interval_minutes = config.refresh.interval_minutes, "Refresh interval changed");
                                scheduler.reconfigure(period);
                            }
                        }
                        Err(e) => warn!(error = %e, "Config reload failed; keeping previous settings"),
                    }
                }
            }
        }

        scheduler.shutdown();
        drop(watcher);
        Ok("Watch stopped".to_string())
    }

    /// Targets from `--target` names, or a multi-select over cached targets.
    async fn targets(&self, args: &TargetArgs) -> Result<Vec<PermissionTarget>, SfkitError> {
        let snapshot = self.snapshot(args.refresh).await?;
        if args.targets.is_empty() {
            prompt::select_targets(&snapshot.permission_targets())
        } else {
            resolve_targets(&snapshot, &args.targets)
        }
    }

    async fn handle_perms_command(&self, command: &PermsCommands) -> Result<String, SfkitError> {
        match command {
            PermsCommands::Object {
                object,
                path,
                targets,
                grant,
                revoke,
                no_deploy,
            } => {
                let object = object_subject(object.as_deref(), path.as_deref())?;
                let targets = self.targets(targets).await?;
                let update = if grant.is_empty() && revoke.is_empty() {
                    let current = object_snapshot(&self.session, &object, &targets).await?;
                    let states: Vec<ObjectPermissionFlags> = targets
                        .iter()
                        .map(|t| current.get(t.parent_id()).copied().unwrap_or_default())
                        .collect();
                    let common = ObjectPermissionFlags::common(&states);
                    let selected =
                        prompt::select_object_flags(common, ObjectPermissionFlags::any(&states))?;
                    ObjectFlagUpdate::from_selection(&common.granted(), &selected)
                } else {
                    ObjectFlagUpdate::from_lists(&object_flags(grant), &object_flags(revoke))
                };

                let edit = ObjectEdit {
                    object,
                    targets,
                    update,
                    deploy: !*no_deploy,
                };
                let spinner = self.spinner(&format!("Updating {} permissions", edit.object));
                let report = PermissionEditor::new(&self.session).edit_object(&edit).await;
                spinner.finish();
                self.render_report(report?)
            }
            PermsCommands::Field {
                field,
                path,
                targets,
                grant,
                revoke,
                no_deploy,
            } => {
                let (object, field) = field_subject(field.as_deref(), path.as_deref())?;
                let targets = self.targets(targets).await?;
                let update = if grant.is_empty() && revoke.is_empty() {
                    let current = field_snapshot(&self.session, &field, &targets).await?;
                    let states: Vec<FieldPermissionFlags> = targets
                        .iter()
                        .map(|t| current.get(t.parent_id()).copied().unwrap_or_default())
                        .collect();
                    let common = FieldPermissionFlags::common(&states);
                    let selected =
                        prompt::select_field_flags(common, FieldPermissionFlags::any(&states))?;
                    FieldFlagUpdate::from_selection(&common.granted(), &selected)
                } else {
                    FieldFlagUpdate::from_lists(&field_flags(grant), &field_flags(revoke))
                };

                let edit = FieldEdit {
                    object,
                    field,
                    targets,
                    update,
                    deploy: !*no_deploy,
                };
                let spinner = self.spinner(&format!("Updating {} permissions", edit.field));
                let report = PermissionEditor::new(&self.session).edit_field(&edit).await;
                spinner.finish();
                self.render_report(report?)
            }
            PermsCommands::Show {
                object,
                field,
                path,
                targets,
            } => {
                let subject = match (object, field, path) {
                    (Some(object), _, _) => MetadataRef::Object {
                        object_api_name: object.clone(),
                    },
                    (None, Some(field), _) => MetadataRef::field_from_full_name(field)
                        .ok_or_else(|| invalid_field(field))?,
                    (None, None, Some(path)) => parse_metadata_path(path)
                        .ok_or_else(|| unrecognized_path(path))?,
                    (None, None, None) => MetadataRef::Object {
                        object_api_name: prompt::text("Object API name", "--object")?,
                    },
                };
                let targets = self.targets(targets).await?;
                let (title, views, is_field) = match &subject {
                    MetadataRef::Object { object_api_name } => {
                        let current = object_snapshot(&self.session, object_api_name, &targets).await?;
                        let views = targets
                            .into_iter()
                            .map(|target| PermissionView {
                                object: Some(current.get(target.parent_id()).copied().unwrap_or_default()),
                                field: None,
                                target,
                            })
                            .collect::<Vec<_>>();
                        (object_api_name.clone(), views, false)
                    }
                    MetadataRef::Field { field_full_name, .. } => {
                        let current = field_snapshot(&self.session, field_full_name, &targets).await?;
                        let views = targets
                            .into_iter()
                            .map(|target| PermissionView {
                                object: None,
                                field: Some(current.get(target.parent_id()).copied().unwrap_or_default()),
                                target,
                            })
                            .collect::<Vec<_>>();
                        (field_full_name.clone(), views, true)
                    }
                };
                if self.json() {
                    to_json(&views)
                } else {
                    Ok(format_permission_views_text(&title, &views, is_field))
                }
            }
        }
    }

    /// Render an edit report; failures still carry the full table.
    fn render_report(&self, report: EditReport) -> Result<String, SfkitError> {
        let rendered = if self.json() {
            to_json(&report)?
        } else {
            format_edit_report_text(&report)
        };
        match report.into_result() {
            Ok(_) => Ok(rendered),
            Err(SfkitError::PartialFailure { failed, total, .. }) => Err(SfkitError::PartialFailure {
                failed,
                total,
                report: rendered,
            }),
            Err(e) => Err(e),
        }
    }

    async fn handle_permset_command(&self, command: &PermsetCommands) -> Result<String, SfkitError> {
        match command {
            PermsetCommands::List { refresh } => {
                let snapshot = self.snapshot(*refresh).await?;
                let sets = permset::list(&snapshot);
                if self.json() {
                    to_json(&sets)
                } else {
                    Ok(format_permission_sets_text(&sets))
                }
            }
            PermsetCommands::Create {
                label,
                name,
                description,
                activation_required,
            } => {
                let (label, name) = match label {
                    Some(label) => (label.clone(), name.clone()),
                    None => {
                        let label = prompt::text("Permission set label", "--label")?;
                        let name = match name {
                            Some(name) => name.clone(),
                            None => prompt::text_with_default("API name", &label_to_developer_name(&label))?,
                        };
                        (label, Some(name))
                    }
                };
                let request = CreateRequest {
                    label,
                    name,
                    description: description.clone(),
                    activation_required: *activation_required,
                };
                let spinner = self.spinner("Creating permission set");
                let created = permset::create(&self.session, &request).await;
                spinner.finish();
                let created = created?;
                if self.json() {
                    to_json(&created)
                } else {
                    Ok(format_created(&created))
                }
            }
            PermsetCommands::Delete { name, yes } => {
                let name = match name {
                    Some(name) => name.clone(),
                    None => self.pick_permission_set("Permission set to delete").await?,
                };
                if !*yes && !prompt::confirm(&format!("Delete permission set {} from the org?", name))? {
                    return Ok("Deletion cancelled".to_string());
                }
                let spinner = self.spinner(&format!("Deleting {}", name));
                let deleted = permset::delete(&self.session, &name).await;
                spinner.finish();
                let deleted = deleted?;
                if self.json() {
                    to_json(&deleted)
                } else {
                    Ok(format_deleted(&deleted))
                }
            }
            PermsetCommands::Assign { name, user } => {
                let name = match name {
                    Some(name) => name.clone(),
                    None => self.pick_permission_set("Permission set to assign").await?,
                };
                let spinner = self.spinner(&format!("Assigning {}", name));
                let assignment = permset::assign(&self.session, &name, user.as_deref()).await;
                spinner.finish();
                let assignment = assignment?;
                if self.json() {
                    to_json(&assignment)
                } else {
                    Ok(format_assignment(&assignment))
                }
            }
        }
    }

    async fn pick_permission_set(&self, prompt_text: &str) -> Result<String, SfkitError> {
        let snapshot = self.snapshot(false).await?;
        let sets = permset::list(&snapshot);
        let items: Vec<String> = sets
            .iter()
            .map(|ps| match &ps.label {
                Some(label) if label != &ps.name => format!("{} ({})", label, ps.name),
                _ => ps.name.clone(),
            })
            .collect();
        let index = prompt::select_one(prompt_text, &items, "permission set name")?;
        Ok(sets[index].name.clone())
    }

    async fn handle_label_command(&self, command: &LabelCommands) -> Result<String, SfkitError> {
        match command {
            LabelCommands::Create {
                value,
                name,
                description,
                language,
                protected,
                categories,
                deploy,
            } => {
                let value = match value {
                    Some(value) => value.clone(),
                    None => prompt::text("Label value", "--value")?,
                };
                let request = LabelRequest {
                    value,
                    name: name.clone(),
                    description: description.clone(),
                    language: language.clone(),
                    protected: *protected,
                    categories: categories.clone(),
                    deploy: *deploy,
                };
                let written = labels::create(&self.session, &request).await?;
                if self.json() {
                    to_json(&written)
                } else {
                    Ok(format_label_written(&written))
                }
            }
        }
    }

    async fn handle_package_command(&self, command: &PackageCommands) -> Result<String, SfkitError> {
        match command {
            PackageCommands::List => {
                let spinner = self.spinner("Listing packages");
                let packages = package::list(&self.session).await;
                spinner.finish();
                let packages = packages?;
                if self.json() {
                    to_json(&packages)
                } else {
                    Ok(format_packages_text(&packages))
                }
            }
            PackageCommands::VersionCreate {
                package: package_name,
                installation_key,
                wait,
                code_coverage,
                skip_validation,
            } => {
                let package_name = match package_name {
                    Some(name) => name.clone(),
                    None => {
                        let packages = package::list(&self.session).await?;
                        let items: Vec<String> = packages.iter().map(|p| p.name.clone()).collect();
                        let index = prompt::select_one("Package", &items, "--package")?;
                        packages[index].id.clone()
                    }
                };
                let request = VersionRequest {
                    package: package_name,
                    installation_key: installation_key.clone(),
                    wait_minutes: *wait,
                    code_coverage: *code_coverage,
                    skip_validation: *skip_validation,
                };
                let spinner = self.spinner("Creating package version");
                let result = package::create_version(&self.session, &request).await;
                spinner.finish();
                let result = result?;
                if self.json() {
                    to_json(&result)
                } else {
                    Ok(format_version_result(&result))
                }
            }
        }
    }

    async fn handle_deploy(&self, paths: &[PathBuf]) -> Result<String, SfkitError> {
        let root = self.session.workspace_root();
        let paths: Vec<PathBuf> = if paths.is_empty() {
            vec![self.session.project().default_package_path(root)]
        } else {
            paths
                .iter()
                .map(|p| {
                    dunce::canonicalize(p).map_err(|e| {
                        SfkitError::InvalidInput(format!("{}: {}", p.display(), e))
                    })
                })
                .collect::<Result<_, _>>()?
        };
        let spinner = self.spinner("Deploying source");
        let report = deploy_source(&self.session, &paths).await;
        spinner.finish();
        let report = report?;
        if self.json() {
            to_json(&report)
        } else {
            Ok(format_operation_report("Deployed", &report))
        }
    }
}

/// Effective configuration for `config show`, with or without a project.
pub fn show_config(workspace: Option<&Path>, config_file: Option<&Path>) -> Result<String, SfkitError> {
    let start = match workspace {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let root = find_workspace_root(&start).unwrap_or(start);
    ConfigLoader::load_with_override(&root, config_file)?
        .validated()?
        .to_toml()
}

fn object_flags(args: &[ObjectFlagArg]) -> Vec<ObjectFlag> {
    args.iter().map(|a| ObjectFlag::from(*a)).collect()
}

fn field_flags(args: &[FieldFlagArg]) -> Vec<FieldFlag> {
    args.iter().map(|a| FieldFlag::from(*a)).collect()
}

fn object_subject(object: Option<&str>, path: Option<&Path>) -> Result<String, SfkitError> {
    match (object, path) {
        (Some(object), _) if !object.trim().is_empty() => Ok(object.trim().to_string()),
        (_, Some(path)) => parse_metadata_path(path)
            .map(|r| r.object_api_name().to_string())
            .ok_or_else(|| unrecognized_path(path)),
        _ => prompt::text("Object API name", "--object"),
    }
}

/// `(object, Object.Field)` from `--field`, `--path`, or a prompt.
fn field_subject(field: Option<&str>, path: Option<&Path>) -> Result<(String, String), SfkitError> {
    let reference = match (field, path) {
        (Some(field), _) => MetadataRef::field_from_full_name(field.trim()).ok_or_else(|| invalid_field(field))?,
        (None, Some(path)) => match parse_metadata_path(path) {
            Some(reference @ MetadataRef::Field { .. }) => reference,
            Some(MetadataRef::Object { .. }) => {
                return Err(SfkitError::InvalidInput(format!(
                    "{} is an object file; pass a field file",
                    path.display()
                )))
            }
            None => return Err(unrecognized_path(path)),
        },
        (None, None) => {
            let field = prompt::text("Field (Object.Field)", "--field")?;
            MetadataRef::field_from_full_name(&field).ok_or_else(|| invalid_field(&field))?
        }
    };
    match reference {
        MetadataRef::Field {
            object_api_name,
            field_full_name,
            ..
        } => Ok((object_api_name, field_full_name)),
        MetadataRef::Object { object_api_name } => Err(invalid_field(&object_api_name)),
    }
}

fn invalid_field(field: &str) -> SfkitError {
    SfkitError::InvalidInput(format!("field must be Object.Field, got {:?}", field))
}

fn unrecognized_path(path: &Path) -> SfkitError {
    SfkitError::InvalidInput(format!(
        "{} is not an object or field metadata file",
        path.display()
    ))
}
