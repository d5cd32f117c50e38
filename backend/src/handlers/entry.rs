//! Logbook entry HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use shared::models::{LogbookEntry, Role, WeeklySummary};
use shared::types::PaginatedResponse;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::entry::{CreateEntryInput, EntryFilter, EntryService, UpdateEntryInput};
use crate::AppState;

/// List entries. Apprentices see their own; supervisors and owners can
/// browse the whole org or filter by apprentice.
pub async fn list_entries(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(mut filter): Query<EntryFilter>,
) -> AppResult<Json<PaginatedResponse<LogbookEntry>>> {
    if user.role == Role::Apprentice {
        filter.apprentice_id = Some(user.user_id);
    }

    let service = EntryService::new(state.db.clone());
    let entries = service.list_entries(user.org_id, &filter).await?;
    Ok(Json(entries))
}

/// Create a logbook entry for the caller
pub async fn create_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateEntryInput>,
) -> AppResult<(StatusCode, Json<LogbookEntry>)> {
    let service = EntryService::new(state.db.clone());
    let entry = service.create_entry(user.org_id, user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Get a single entry
pub async fn get_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(entry_id): Path<Uuid>,
) -> AppResult<Json<LogbookEntry>> {
    let service = EntryService::new(state.db.clone());
    let entry = service.get_entry(user.org_id, entry_id).await?;

    if user.role == Role::Apprentice && entry.apprentice_id != user.user_id {
        return Err(AppError::NotFound("Entry".to_string()));
    }

    Ok(Json(entry))
}

/// Update an entry the caller wrote
pub async fn update_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(entry_id): Path<Uuid>,
    Json(input): Json<UpdateEntryInput>,
) -> AppResult<Json<LogbookEntry>> {
    let service = EntryService::new(state.db.clone());
    let entry = service
        .update_entry(user.org_id, user.user_id, entry_id, input)
        .await?;
    Ok(Json(entry))
}

/// Soft-delete an entry the caller wrote
pub async fn delete_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(entry_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = EntryService::new(state.db.clone());
    service
        .delete_entry(user.org_id, user.user_id, entry_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Weekly hours summary for an apprentice
pub async fn weekly_summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(apprentice_id): Path<Uuid>,
) -> AppResult<Json<Vec<WeeklySummary>>> {
    if user.role == Role::Apprentice && apprentice_id != user.user_id {
        return Err(AppError::InsufficientPermissions);
    }

    let service = EntryService::new(state.db.clone());
    let summary = service.weekly_summary(user.org_id, apprentice_id).await?;
    Ok(Json(summary))
}

/// Export an apprentice's entries as CSV evidence for training reviews
pub async fn export_entries_csv(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(apprentice_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    if user.role == Role::Apprentice && apprentice_id != user.user_id {
        return Err(AppError::InsufficientPermissions);
    }

    let service = EntryService::new(state.db.clone());
    let csv = service.export_csv(user.org_id, apprentice_id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"logbook_entries.csv\"",
            ),
        ],
        csv,
    ))
}
