//! Workspace-scoped cache of org identifiers.
//!
//! Profiles and permission sets are stored as JSON values under fixed keys in a
//! sled database and overwritten wholesale on each refresh. The database is
//! opened for each read or write and closed again, so a long-running `watch`
//! never locks other commands out of the workspace.

use crate::error::SfkitError;
use crate::org::records::{PermissionSet, Profile};
use crate::permissions::PermissionTarget;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const PROFILES_KEY: &str = "profiles";
const PERMISSION_SETS_KEY: &str = "permission_sets";
const REFRESHED_AT_KEY: &str = "refreshed_at";

const LOCK_ATTEMPTS: u32 = 20;
const LOCK_BACKOFF: Duration = Duration::from_millis(25);

/// Result of one refresh query round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgSnapshot {
    pub profiles: Vec<Profile>,
    pub permission_sets: Vec<PermissionSet>,
    pub refreshed_at: DateTime<Utc>,
}

impl OrgSnapshot {
    /// Every editable permission container. Profiles without an owned permission set are skipped.
    pub fn permission_targets(&self) -> Vec<PermissionTarget> {
        let permission_sets = self.permission_sets.iter().map(|ps| PermissionTarget::PermissionSet {
            id: ps.id.clone(),
            name: ps.name.clone(),
            label: ps.label.clone(),
            namespace_prefix: ps.namespace_prefix.clone(),
        });
        let profiles = self.profiles.iter().filter_map(|profile| match &profile.permission_set_id {
            Some(permission_set_id) => Some(PermissionTarget::Profile {
                id: profile.id.clone(),
                name: profile.name.clone(),
                permission_set_id: permission_set_id.clone(),
            }),
            None => {
                debug!(profile = %profile.name, "Profile has no owned permission set");
                None
            }
        });
        permission_sets.chain(profiles).collect()
    }

    /// Permission set by API name or label (case-insensitive).
    pub fn permission_set(&self, name: &str) -> Option<PermissionTarget> {
        self.permission_targets().into_iter().find(|target| match target {
            PermissionTarget::PermissionSet { name: n, label, .. } => {
                n.eq_ignore_ascii_case(name)
                    || label.as_deref().map(|l| l.eq_ignore_ascii_case(name)).unwrap_or(false)
            }
            PermissionTarget::Profile { .. } => false,
        })
    }

    /// Profile by name (case-insensitive).
    pub fn profile(&self, name: &str) -> Option<PermissionTarget> {
        self.permission_targets().into_iter().find(|target| {
            target.is_profile() && target.name().eq_ignore_ascii_case(name)
        })
    }
}

/// Sled-backed cache
pub struct MetadataCache {
    store: CacheStore,
}

enum CacheStore {
    /// On-disk database opened per operation.
    Path(PathBuf),
    /// In-memory database held for the cache's lifetime.
    Temporary(sled::Db),
}

impl MetadataCache {
    /// Cache database at `path`. The directory is created; the database is opened lazily.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SfkitError> {
        let path = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path).map_err(|e| {
            SfkitError::Storage(format!("Failed to create cache at {}: {}", path.display(), e))
        })?;
        Ok(Self {
            store: CacheStore::Path(path),
        })
    }

    /// In-memory cache removed on drop.
    pub fn temporary() -> Result<Self, SfkitError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self {
            store: CacheStore::Temporary(db),
        })
    }

    fn with_db<T>(&self, op: impl FnOnce(&sled::Db) -> Result<T, SfkitError>) -> Result<T, SfkitError> {
        match &self.store {
            CacheStore::Temporary(db) => op(db),
            CacheStore::Path(path) => {
                let db = open_with_backoff(path)?;
                op(&db)
            }
        }
    }

    /// Replace the cached snapshot in one atomic batch.
    pub fn store_snapshot(&self, snapshot: &OrgSnapshot) -> Result<(), SfkitError> {
        let mut batch = sled::Batch::default();
        batch.insert(PROFILES_KEY, serde_json::to_vec(&snapshot.profiles)?);
        batch.insert(PERMISSION_SETS_KEY, serde_json::to_vec(&snapshot.permission_sets)?);
        batch.insert(REFRESHED_AT_KEY, serde_json::to_vec(&snapshot.refreshed_at)?);
        self.with_db(|db| {
            db.apply_batch(batch)?;
            db.flush()?;
            Ok(())
        })?;
        debug!(
            profiles = snapshot.profiles.len(),
            permission_sets = snapshot.permission_sets.len(),
            "Cache overwritten"
        );
        Ok(())
    }

    /// The last stored snapshot, if a refresh ever completed.
    pub fn load_snapshot(&self) -> Result<Option<OrgSnapshot>, SfkitError> {
        self.with_db(|db| {
            let Some(refreshed_at) = get::<DateTime<Utc>>(db, REFRESHED_AT_KEY)? else {
                return Ok(None);
            };
            Ok(Some(OrgSnapshot {
                profiles: get(db, PROFILES_KEY)?.unwrap_or_default(),
                permission_sets: get(db, PERMISSION_SETS_KEY)?.unwrap_or_default(),
                refreshed_at,
            }))
        })
    }

    pub fn refreshed_at(&self) -> Result<Option<DateTime<Utc>>, SfkitError> {
        self.with_db(|db| get(db, REFRESHED_AT_KEY))
    }
}

/// Open the database, waiting briefly while another sfkit process holds its lock.
fn open_with_backoff(path: &Path) -> Result<sled::Db, SfkitError> {
    let mut attempt = 1;
    loop {
        match sled::Config::new().path(path).open() {
            Ok(db) => return Ok(db),
            Err(sled::Error::Io(e)) if e.kind() == ErrorKind::WouldBlock && attempt < LOCK_ATTEMPTS => {
                debug!(attempt, cache = %path.display(), "Cache locked, retrying");
                std::thread::sleep(LOCK_BACKOFF * attempt);
                attempt += 1;
            }
            Err(e) => {
                return Err(SfkitError::Storage(format!(
                    "Failed to open cache at {}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }
}

fn get<T: DeserializeOwned>(db: &sled::Db, key: &str) -> Result<Option<T>, SfkitError> {
    match db.get(key)? {
        Some(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // A stale layout is treated as a cache miss; the next refresh rewrites it.
                warn!(key, error = %e, "Ignoring unreadable cache entry");
                Ok(None)
            }
        },
        None => Ok(None),
    }
}
