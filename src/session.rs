//! Per-invocation session: workspace, project, configuration, CLI handle, and cache.
//!
//! Handlers receive a `&Session` instead of reaching for module-level state. The
//! resolved target org and the current user are memoized here for the lifetime of
//! one command.

use crate::cache::{MetadataCache, OrgSnapshot};
use crate::config::{paths, ConfigLoader, SfkitConfig};
use crate::error::SfkitError;
use crate::org::cli::{args, run_json, ProcessCli, SfCli};
use crate::org::records::OrgUser;
use crate::org::rest::{OrgConnection, DEFAULT_API_VERSION};
use crate::project::{find_workspace_root, SfdxProject};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Inputs for [`Session::open`].
#[derive(Default)]
pub struct SessionOptions {
    /// Directory to start the project search from (defaults to the current directory).
    pub workspace: Option<PathBuf>,
    /// Config file replacing discovery.
    pub config_file: Option<PathBuf>,
    /// Org alias or username overriding config and CLI defaults.
    pub target_org: Option<String>,
    /// CLI implementation; the `sf` subprocess when `None`.
    pub cli: Option<Arc<dyn SfCli>>,
    /// Cache database location; the workspace data directory when `None`.
    pub cache_dir: Option<PathBuf>,
}

pub struct Session {
    workspace_root: PathBuf,
    project: SfdxProject,
    config: SfkitConfig,
    config_file: Option<PathBuf>,
    cli: Arc<dyn SfCli>,
    cache: MetadataCache,
    target_org_override: Option<String>,
    target_org: Mutex<Option<String>>,
    current_user: Mutex<Option<OrgUser>>,
}

#[derive(Debug, Deserialize)]
struct ConfigGetEntry {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DisplayedUser {
    id: String,
    username: String,
}

impl Session {
    /// Resolve the workspace and project, load configuration, and open the cache.
    pub fn open(options: SessionOptions) -> Result<Self, SfkitError> {
        let start = match options.workspace {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let workspace_root = find_workspace_root(&start)?;
        let project = SfdxProject::load(&workspace_root)?;

        let config = ConfigLoader::load_with_override(&workspace_root, options.config_file.as_deref())?
            .validated()?;

        let cli = options.cli.unwrap_or_else(|| {
            Arc::new(ProcessCli::new(
                config.cli.binary.clone(),
                workspace_root.clone(),
                config.cli.timeout(),
            ))
        });

        let cache_dir = match options.cache_dir {
            Some(dir) => dir,
            None => paths::workspace_data_dir(&workspace_root)?.join("cache"),
        };
        let cache = MetadataCache::open(&cache_dir)?;
        debug!(workspace = %workspace_root.display(), cache = %cache_dir.display(), "Session opened");

        Ok(Self {
            workspace_root,
            project,
            config,
            config_file: options.config_file,
            cli,
            cache,
            target_org_override: options.target_org,
            target_org: Mutex::new(None),
            current_user: Mutex::new(None),
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn project(&self) -> &SfdxProject {
        &self.project
    }

    pub fn config(&self) -> &SfkitConfig {
        &self.config
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub fn cli(&self) -> &dyn SfCli {
        self.cli.as_ref()
    }

    /// Cached org identifiers, if a refresh has run.
    pub fn snapshot(&self) -> Result<Option<OrgSnapshot>, SfkitError> {
        self.cache.load_snapshot()
    }

    /// REST API version: config override, then the org's reported version, then the
    /// project's source API version, then the default.
    pub fn api_version(&self, connection: &OrgConnection) -> String {
        self.config
            .org
            .api_version
            .clone()
            .or_else(|| connection.api_version.clone())
            .or_else(|| self.project.source_api_version.clone())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string())
    }

    /// Org used for every org call: `--target-org`, then `org.target_org`, then the CLI default.
    pub async fn target_org(&self) -> Result<String, SfkitError> {
        let resolved = self.target_org.lock().clone();
        if let Some(org) = resolved {
            return Ok(org);
        }

        let configured = self
            .target_org_override
            .clone()
            .or_else(|| self.config.org.target_org.clone());
        let org = match configured {
            Some(org) => org,
            None => self.default_org_from_cli().await?,
        };

        *self.target_org.lock() = Some(org.clone());
        Ok(org)
    }

    async fn default_org_from_cli(&self) -> Result<String, SfkitError> {
        let entries: Vec<ConfigGetEntry> =
            run_json(self.cli(), &args(["config", "get", "target-org"])).await?;
        entries
            .into_iter()
            .find_map(|entry| entry.value.filter(|v| !v.trim().is_empty()))
            .ok_or(SfkitError::NoDefaultOrg)
    }

    /// Run a CLI command against the target org and decode its result.
    pub async fn run_org<T: DeserializeOwned>(&self, mut cmd: Vec<String>) -> Result<T, SfkitError> {
        let org = self.target_org().await?;
        cmd.push("--target-org".to_string());
        cmd.push(org);
        run_json(self.cli(), &cmd).await
    }

    /// Run a CLI command that does not take an org.
    pub async fn run_raw<T: DeserializeOwned>(&self, cmd: Vec<String>) -> Result<T, SfkitError> {
        run_json(self.cli(), &cmd).await
    }

    /// The authenticated user, memoized after the first lookup.
    pub async fn current_user(&self) -> Result<OrgUser, SfkitError> {
        let cached = self.current_user.lock().clone();
        if let Some(user) = cached {
            return Ok(user);
        }
        let displayed: DisplayedUser = self.run_org(args(["org", "display", "user"])).await?;
        let user = OrgUser {
            id: displayed.id,
            username: displayed.username,
        };
        info!(username = %user.username, "Resolved current user");
        *self.current_user.lock() = Some(user.clone());
        Ok(user)
    }

    /// Instance URL, access token and API version for REST calls.
    pub async fn connection(&self) -> Result<OrgConnection, SfkitError> {
        self.run_org(args(["org", "display"])).await
    }
}
