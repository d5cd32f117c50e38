//! Sync handlers for offline support
//!
//! Push replays the device's offline queue; pull returns the delta of
//! entries whose `row_version` moved past the device's last-seen version.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::models::{LogbookEntry, Role};

use crate::error::AppResult;
use crate::middleware::{AuthUser, CurrentUser};
use crate::services::sync::{PendingEntry, SyncResult, SyncService, SyncState};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub device_id: String,
    pub entries: Vec<PendingEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub device_id: String,
    pub since_version: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    500
}

impl PullRequest {
    /// Page size as applied to the query. A limit of 0 would advance the
    /// device checkpoint past rows it never received; negative values are
    /// a raw database error.
    fn effective_limit(&self) -> i64 {
        self.limit.clamp(1, 1000)
    }
}

/// Apprentices pull only their own entries, mirroring the entry list;
/// supervisors and owners pull the whole org so review screens stay
/// current across devices.
fn pull_scope(user: &AuthUser) -> Option<Uuid> {
    match user.role {
        Role::Apprentice => Some(user.user_id),
        Role::Supervisor | Role::Owner => None,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    pub changes: Vec<LogbookEntry>,
    pub server_version: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStateQuery {
    pub device_id: String,
}

/// Apply a batch of queued entries from a device
pub async fn push_entries(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<PushRequest>,
) -> AppResult<Json<SyncResult>> {
    let service = SyncService::new(state.db.clone());

    let result = service
        .apply_batch(user.org_id, user.user_id, body.entries)
        .await?;

    service
        .update_sync_state(user.user_id, &body.device_id, result.server_version)
        .await?;

    Ok(Json(result))
}

/// Pull entry changes since the device's last-seen version
pub async fn pull_changes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<PullRequest>,
) -> AppResult<Json<PullResponse>> {
    let service = SyncService::new(state.db.clone());
    let limit = body.effective_limit();

    let changes = service
        .get_changes_since(user.org_id, pull_scope(&user), body.since_version, limit)
        .await?;

    // The device is only caught up to the last change it received, not the
    // org high-water mark, when the page was clipped by `limit`
    let server_version = match changes.last() {
        Some(last) if changes.len() as i64 >= limit => last.row_version,
        _ => service.server_version(user.org_id).await?,
    };

    service
        .update_sync_state(user.user_id, &body.device_id, server_version)
        .await?;

    Ok(Json(PullResponse {
        changes,
        server_version,
    }))
}

/// Get the stored sync state for a device
pub async fn get_sync_state(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SyncStateQuery>,
) -> AppResult<Json<Option<SyncState>>> {
    let service = SyncService::new(state.db.clone());
    let sync_state = service.get_sync_state(user.user_id, &query.device_id).await?;
    Ok(Json(sync_state))
}
