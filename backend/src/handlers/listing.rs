//! Salvage marketplace HTTP handlers
//!
//! Browsing is public; creating and managing listings requires an account.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::models::{Listing, ListingStatus};
use shared::types::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::listing::{
    CreateListingInput, ListingFilter, ListingService, UpdateListingInput,
};
use crate::AppState;

#[derive(Deserialize)]
pub struct StatusChangeRequest {
    pub status: ListingStatus,
}

/// Browse listings with filters (public)
pub async fn search_listings(
    State(state): State<AppState>,
    Query(filter): Query<ListingFilter>,
) -> AppResult<Json<PaginatedResponse<Listing>>> {
    let service = ListingService::new(state.db.clone());
    let listings = service.search_listings(filter).await?;
    Ok(Json(listings))
}

/// Get a single listing (public)
pub async fn get_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> AppResult<Json<Listing>> {
    let service = ListingService::new(state.db.clone());
    let listing = service.get_listing(listing_id).await?;
    Ok(Json(listing))
}

/// Create a listing for the caller
pub async fn create_listing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateListingInput>,
) -> AppResult<(StatusCode, Json<Listing>)> {
    let service = ListingService::new(state.db.clone());
    let listing = service.create_listing(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// List the caller's own listings, any status
pub async fn my_listings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Listing>>> {
    let service = ListingService::new(state.db.clone());
    let listings = service.list_for_seller(user.user_id).await?;
    Ok(Json(listings))
}

/// Edit a listing the caller owns
pub async fn update_listing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(listing_id): Path<Uuid>,
    Json(input): Json<UpdateListingInput>,
) -> AppResult<Json<Listing>> {
    let service = ListingService::new(state.db.clone());
    let listing = service.update_listing(listing_id, user.user_id, input).await?;
    Ok(Json(listing))
}

/// Reserve, release, or mark a listing sold
pub async fn change_listing_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(listing_id): Path<Uuid>,
    Json(body): Json<StatusChangeRequest>,
) -> AppResult<Json<Listing>> {
    let service = ListingService::new(state.db.clone());
    let listing = service
        .change_status(listing_id, user.user_id, body.status)
        .await?;
    Ok(Json(listing))
}

/// Delete a listing the caller owns
pub async fn delete_listing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(listing_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = ListingService::new(state.db.clone());
    service.delete_listing(listing_id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
