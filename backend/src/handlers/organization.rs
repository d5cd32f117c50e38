//! Organisation and member management HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::models::{Organization, User};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::organization::{AddMemberInput, OrganizationService, UpdateMemberInput};
use crate::AppState;

/// Get the caller's organisation
pub async fn get_organization(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Organization>> {
    let service = OrganizationService::new(state.db.clone());
    let org = service.get_organization(user.org_id).await?;
    Ok(Json(org))
}

/// List members of the caller's organisation
pub async fn list_members(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    let service = OrganizationService::new(state.db.clone());
    let members = service.list_members(user.org_id).await?;
    Ok(Json(members))
}

/// Add a member (supervisor or apprentice) to the organisation
pub async fn add_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AddMemberInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    if !user.can_manage_org() {
        return Err(AppError::InsufficientPermissions);
    }

    let service = OrganizationService::new(state.db.clone());
    let member = service.add_member(user.org_id, input).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Get a single member
pub async fn get_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(member_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let service = OrganizationService::new(state.db.clone());
    let member = service.get_member(user.org_id, member_id).await?;
    Ok(Json(member))
}

/// Change a member's role or active flag
pub async fn update_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(member_id): Path<Uuid>,
    Json(input): Json<UpdateMemberInput>,
) -> AppResult<Json<User>> {
    if !user.can_manage_org() {
        return Err(AppError::InsufficientPermissions);
    }

    let service = OrganizationService::new(state.db.clone());
    let member = service.update_member(user.org_id, member_id, input).await?;
    Ok(Json(member))
}
