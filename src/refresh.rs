//! Refresh of cached profiles and permission sets.

pub mod scheduler;

use crate::cache::OrgSnapshot;
use crate::error::SfkitError;
use crate::org::records::{PermissionSet, PermissionSetRow, Profile, ProfileRow};
use crate::org::soql;
use crate::session::Session;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub use scheduler::RefreshScheduler;

/// Something the scheduler can run on every tick.
#[async_trait]
pub trait RefreshTask: Send + Sync {
    async fn run(&self) -> Result<OrgSnapshot, SfkitError>;
}

/// Query profiles and permission sets and overwrite the cache.
pub async fn refresh(session: &Session) -> Result<OrgSnapshot, SfkitError> {
    let profile_rows: Vec<ProfileRow> = soql::query(session, &soql::profiles()).await?;
    let owned_rows: Vec<PermissionSetRow> =
        soql::query(session, &soql::profile_owned_permission_sets()).await?;
    let permission_set_rows: Vec<PermissionSetRow> =
        soql::query(session, &soql::permission_sets()).await?;

    let snapshot = build_snapshot(profile_rows, owned_rows, permission_set_rows);
    session.cache().store_snapshot(&snapshot)?;
    info!(
        profiles = snapshot.profiles.len(),
        permission_sets = snapshot.permission_sets.len(),
        "Org identifiers refreshed"
    );
    Ok(snapshot)
}

/// Join profiles with their owned permission sets.
fn build_snapshot(
    profile_rows: Vec<ProfileRow>,
    owned_rows: Vec<PermissionSetRow>,
    permission_set_rows: Vec<PermissionSetRow>,
) -> OrgSnapshot {
    let owned_by_profile: HashMap<String, String> = owned_rows
        .into_iter()
        .filter_map(|row| row.profile_id.map(|profile_id| (profile_id, row.id)))
        .collect();

    let profiles = profile_rows
        .into_iter()
        .map(|row| Profile {
            permission_set_id: owned_by_profile.get(&row.id).cloned(),
            id: row.id,
            name: row.name,
        })
        .collect();

    let permission_sets = permission_set_rows
        .into_iter()
        .filter(|row| row.is_owned_by_profile != Some(true))
        .map(PermissionSet::from)
        .collect();

    OrgSnapshot {
        profiles,
        permission_sets,
        refreshed_at: Utc::now(),
    }
}

/// Refresh bound to a shared session, for the scheduler.
pub struct SessionRefresh {
    session: Arc<Session>,
}

impl SessionRefresh {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl RefreshTask for SessionRefresh {
    async fn run(&self) -> Result<OrgSnapshot, SfkitError> {
        refresh(&self.session).await
    }
}
