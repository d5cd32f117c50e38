//! Salvage marketplace listing service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{Listing, ListingCondition, ListingStatus};
use shared::types::{MediaReference, PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::{validate_listing_price, validate_quantity};

use crate::error::{AppError, AppResult};

const LISTING_COLUMNS: &str = "id, seller_id, title, category, condition, quantity, unit, \
     price, region, description, photos, status, created_at, updated_at";

/// Listing service
#[derive(Clone)]
pub struct ListingService {
    db: PgPool,
}

/// Input for creating a listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingInput {
    pub title: String,
    pub category: String,
    pub condition: ListingCondition,
    pub quantity: i32,
    pub unit: String,
    pub price: Decimal,
    pub region: String,
    pub description: Option<String>,
    #[serde(default)]
    pub photos: Vec<MediaReference>,
}

/// Input for editing a listing; status moves go through `change_status`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingInput {
    pub title: Option<String>,
    pub category: Option<String>,
    pub condition: Option<ListingCondition>,
    pub quantity: Option<i32>,
    pub unit: Option<String>,
    pub price: Option<Decimal>,
    pub region: Option<String>,
    pub description: Option<String>,
    pub photos: Option<Vec<MediaReference>>,
}

/// Search filter for browsing listings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingFilter {
    pub category: Option<String>,
    pub region: Option<String>,
    pub condition: Option<ListingCondition>,
    /// Free-text match on title
    pub q: Option<String>,
    pub max_price: Option<Decimal>,
    /// Defaults to active-only; pass a status to browse reserved/sold
    pub status: Option<ListingStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    id: Uuid,
    seller_id: Uuid,
    title: String,
    category: String,
    condition: String,
    quantity: i32,
    unit: String,
    price: Decimal,
    region: String,
    description: Option<String>,
    photos: serde_json::Value,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ListingRow {
    fn into_listing(self) -> AppResult<Listing> {
        let condition = ListingCondition::from_str(&self.condition).map_err(AppError::Internal)?;
        let status = ListingStatus::from_str(&self.status).map_err(AppError::Internal)?;
        let photos: Vec<MediaReference> = serde_json::from_value(self.photos)
            .map_err(|e| AppError::Internal(format!("Invalid photos payload: {}", e)))?;
        Ok(Listing {
            id: self.id,
            seller_id: self.seller_id,
            title: self.title,
            category: self.category,
            condition,
            quantity: self.quantity,
            unit: self.unit,
            price: self.price,
            region: self.region,
            description: self.description,
            photos,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ListingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a listing, initially active
    pub async fn create_listing(
        &self,
        seller_id: Uuid,
        input: CreateListingInput,
    ) -> AppResult<Listing> {
        if input.title.trim().is_empty() {
            return Err(AppError::Validation {
                field: "title".to_string(),
                message: "Title is required".to_string(),
            });
        }
        validate_listing_price(input.price).map_err(|msg| AppError::Validation {
            field: "price".to_string(),
            message: msg.to_string(),
        })?;
        validate_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;

        let photos = serde_json::to_value(&input.photos)
            .map_err(|e| AppError::Internal(format!("Photo serialization failed: {}", e)))?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO listings
                (seller_id, title, category, condition, quantity, unit, price,
                 region, description, photos, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'active')
            RETURNING id
            "#,
        )
        .bind(seller_id)
        .bind(&input.title)
        .bind(&input.category)
        .bind(input.condition.as_str())
        .bind(input.quantity)
        .bind(&input.unit)
        .bind(input.price)
        .bind(&input.region)
        .bind(&input.description)
        .bind(&photos)
        .fetch_one(&self.db)
        .await?;

        self.get_listing(id).await
    }

    /// Get a single listing
    pub async fn get_listing(&self, id: Uuid) -> AppResult<Listing> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {} FROM listings WHERE id = $1",
            LISTING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing".to_string()))?;

        row.into_listing()
    }

    /// Browse listings with filters, newest first
    pub async fn search_listings(
        &self,
        filter: ListingFilter,
    ) -> AppResult<PaginatedResponse<Listing>> {
        let pagination = Pagination {
            page: filter.page.unwrap_or(1).max(1),
            per_page: filter.per_page.unwrap_or(20).clamp(1, 100),
        };
        let status = filter.status.unwrap_or(ListingStatus::Active);
        let title_pattern = filter.q.as_ref().map(|q| format!("%{}%", q.trim()));
        let condition = filter.condition.map(|c| c.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM listings
            WHERE status = $1
              AND ($2::text IS NULL OR category = $2)
              AND ($3::text IS NULL OR region = $3)
              AND ($4::text IS NULL OR condition = $4)
              AND ($5::text IS NULL OR title ILIKE $5)
              AND ($6::numeric IS NULL OR price <= $6)
            "#,
        )
        .bind(status.as_str())
        .bind(&filter.category)
        .bind(&filter.region)
        .bind(condition)
        .bind(&title_pattern)
        .bind(filter.max_price)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            SELECT {} FROM listings
            WHERE status = $1
              AND ($2::text IS NULL OR category = $2)
              AND ($3::text IS NULL OR region = $3)
              AND ($4::text IS NULL OR condition = $4)
              AND ($5::text IS NULL OR title ILIKE $5)
              AND ($6::numeric IS NULL OR price <= $6)
            ORDER BY created_at DESC
            LIMIT $7 OFFSET $8
            "#,
            LISTING_COLUMNS
        ))
        .bind(status.as_str())
        .bind(&filter.category)
        .bind(&filter.region)
        .bind(condition)
        .bind(&title_pattern)
        .bind(filter.max_price)
        .bind(pagination.per_page as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.db)
        .await?;

        let listings = rows
            .into_iter()
            .map(ListingRow::into_listing)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data: listings,
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }

    /// List a seller's own listings, any status
    pub async fn list_for_seller(&self, seller_id: Uuid) -> AppResult<Vec<Listing>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {} FROM listings WHERE seller_id = $1 ORDER BY created_at DESC",
            LISTING_COLUMNS
        ))
        .bind(seller_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(ListingRow::into_listing).collect()
    }

    /// Edit listing content. Only the seller may edit, and not once sold.
    pub async fn update_listing(
        &self,
        id: Uuid,
        seller_id: Uuid,
        input: UpdateListingInput,
    ) -> AppResult<Listing> {
        let existing = self.get_listing(id).await?;
        if existing.seller_id != seller_id {
            return Err(AppError::InsufficientPermissions);
        }
        if existing.status == ListingStatus::Sold {
            return Err(AppError::Conflict {
                resource: "listing".to_string(),
                message: "Sold listings cannot be edited".to_string(),
            });
        }

        let price = input.price.unwrap_or(existing.price);
        validate_listing_price(price).map_err(|msg| AppError::Validation {
            field: "price".to_string(),
            message: msg.to_string(),
        })?;
        let quantity = input.quantity.unwrap_or(existing.quantity);
        validate_quantity(quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;

        let title = input.title.unwrap_or(existing.title);
        let category = input.category.unwrap_or(existing.category);
        let condition = input.condition.unwrap_or(existing.condition);
        let unit = input.unit.unwrap_or(existing.unit);
        let region = input.region.unwrap_or(existing.region);
        let description = input.description.or(existing.description);
        let photos = input.photos.unwrap_or(existing.photos);
        let photos = serde_json::to_value(&photos)
            .map_err(|e| AppError::Internal(format!("Photo serialization failed: {}", e)))?;

        sqlx::query(
            r#"
            UPDATE listings
            SET title = $1, category = $2, condition = $3, quantity = $4, unit = $5,
                price = $6, region = $7, description = $8, photos = $9, updated_at = NOW()
            WHERE id = $10
            "#,
        )
        .bind(&title)
        .bind(&category)
        .bind(condition.as_str())
        .bind(quantity)
        .bind(&unit)
        .bind(price)
        .bind(&region)
        .bind(&description)
        .bind(&photos)
        .bind(id)
        .execute(&self.db)
        .await?;

        self.get_listing(id).await
    }

    /// Move a listing through its lifecycle (reserve, release, mark sold)
    pub async fn change_status(
        &self,
        id: Uuid,
        seller_id: Uuid,
        next: ListingStatus,
    ) -> AppResult<Listing> {
        let existing = self.get_listing(id).await?;
        if existing.seller_id != seller_id {
            return Err(AppError::InsufficientPermissions);
        }

        if !existing.status.can_transition_to(next) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot move listing from {} to {}",
                existing.status, next
            )));
        }

        sqlx::query("UPDATE listings SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(next.as_str())
            .bind(id)
            .execute(&self.db)
            .await?;

        self.get_listing(id).await
    }

    /// Delete a listing. Sold listings stay for the buyer's records.
    pub async fn delete_listing(&self, id: Uuid, seller_id: Uuid) -> AppResult<()> {
        let existing = self.get_listing(id).await?;
        if existing.seller_id != seller_id {
            return Err(AppError::InsufficientPermissions);
        }
        if existing.status == ListingStatus::Sold {
            return Err(AppError::Conflict {
                resource: "listing".to_string(),
                message: "Sold listings cannot be deleted".to_string(),
            });
        }

        sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}
