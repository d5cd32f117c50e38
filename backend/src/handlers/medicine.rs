//! Medicine catalogue and comparison HTTP handlers
//!
//! Lookup and comparison are public: the comparison tool runs without an
//! account. The catalogue is shared across all organisations, so writes
//! require a platform admin.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::models::{Medicine, MedicineComparison};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::medicine::{MedicineService, UpsertMedicineInput};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareQuery {
    pub first: String,
    pub second: String,
}

/// Look up a medicine by scanned barcode (public)
pub async fn lookup_medicine(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> AppResult<Json<Medicine>> {
    let service = MedicineService::new(state.db.clone());
    let medicine = service.get_by_barcode(&barcode).await?;
    Ok(Json(medicine))
}

/// Compare two scanned barcodes (public)
pub async fn compare_medicines(
    State(state): State<AppState>,
    Query(query): Query<CompareQuery>,
) -> AppResult<Json<MedicineComparison>> {
    let service = MedicineService::new(state.db.clone());
    let comparison = service.compare_barcodes(&query.first, &query.second).await?;
    Ok(Json(comparison))
}

/// List the catalogue
pub async fn list_medicines(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> AppResult<Json<Vec<Medicine>>> {
    let service = MedicineService::new(state.db.clone());
    let medicines = service.list_medicines().await?;
    Ok(Json(medicines))
}

/// Add a medicine to the catalogue (platform admin only)
pub async fn create_medicine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<UpsertMedicineInput>,
) -> AppResult<(StatusCode, Json<Medicine>)> {
    if !user.is_platform_admin() {
        return Err(AppError::InsufficientPermissions);
    }

    let service = MedicineService::new(state.db.clone());
    let medicine = service.create_medicine(input).await?;
    Ok((StatusCode::CREATED, Json(medicine)))
}

/// Get a catalogue medicine by id
pub async fn get_medicine(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(medicine_id): Path<Uuid>,
) -> AppResult<Json<Medicine>> {
    let service = MedicineService::new(state.db.clone());
    let medicine = service.get_medicine(medicine_id).await?;
    Ok(Json(medicine))
}

/// Update a catalogue medicine (platform admin only)
pub async fn update_medicine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(medicine_id): Path<Uuid>,
    Json(input): Json<UpsertMedicineInput>,
) -> AppResult<Json<Medicine>> {
    if !user.is_platform_admin() {
        return Err(AppError::InsufficientPermissions);
    }

    let service = MedicineService::new(state.db.clone());
    let medicine = service.update_medicine(medicine_id, input).await?;
    Ok(Json(medicine))
}

/// Remove a catalogue medicine (platform admin only)
pub async fn delete_medicine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(medicine_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !user.is_platform_admin() {
        return Err(AppError::InsufficientPermissions);
    }

    let service = MedicineService::new(state.db.clone());
    service.delete_medicine(medicine_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
