//! Medicine catalogue service for the barcode-comparison app

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{compare_medicines, ActiveIngredient, Medicine, MedicineComparison};
use shared::validation::validate_gtin13;

use crate::error::{AppError, AppResult};

/// Medicine service
#[derive(Clone)]
pub struct MedicineService {
    db: PgPool,
}

/// Input for creating or updating a catalogue medicine
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertMedicineInput {
    pub name: String,
    pub brand: Option<String>,
    pub barcode: String,
    pub ingredients: Vec<ActiveIngredient>,
    pub form: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct MedicineRow {
    id: Uuid,
    name: String,
    brand: Option<String>,
    barcode: String,
    ingredients: serde_json::Value,
    form: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MedicineRow {
    fn into_medicine(self) -> AppResult<Medicine> {
        let ingredients: Vec<ActiveIngredient> = serde_json::from_value(self.ingredients)
            .map_err(|e| AppError::Internal(format!("Invalid ingredients payload: {}", e)))?;
        Ok(Medicine {
            id: self.id,
            name: self.name,
            brand: self.brand,
            barcode: self.barcode,
            ingredients,
            form: self.form,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl MedicineService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    fn validate_input(input: &UpsertMedicineInput) -> AppResult<()> {
        validate_gtin13(&input.barcode).map_err(|msg| AppError::Validation {
            field: "barcode".to_string(),
            message: msg.to_string(),
        })?;
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Name is required".to_string(),
            });
        }
        if input.ingredients.is_empty() {
            return Err(AppError::Validation {
                field: "ingredients".to_string(),
                message: "At least one active ingredient is required".to_string(),
            });
        }
        Ok(())
    }

    /// Add a medicine to the catalogue
    pub async fn create_medicine(&self, input: UpsertMedicineInput) -> AppResult<Medicine> {
        Self::validate_input(&input)?;

        let existing =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM medicines WHERE barcode = $1")
                .bind(&input.barcode)
                .fetch_one(&self.db)
                .await?;

        if existing > 0 {
            return Err(AppError::DuplicateEntry("barcode".to_string()));
        }

        let ingredients = serde_json::to_value(&input.ingredients)
            .map_err(|e| AppError::Internal(format!("Ingredient serialization failed: {}", e)))?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO medicines (name, brand, barcode, ingredients, form)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&input.name)
        .bind(&input.brand)
        .bind(&input.barcode)
        .bind(&ingredients)
        .bind(&input.form)
        .fetch_one(&self.db)
        .await?;

        self.get_medicine(id).await
    }

    /// Get a medicine by id
    pub async fn get_medicine(&self, id: Uuid) -> AppResult<Medicine> {
        let row = sqlx::query_as::<_, MedicineRow>(
            "SELECT id, name, brand, barcode, ingredients, form, created_at, updated_at FROM medicines WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Medicine".to_string()))?;

        row.into_medicine()
    }

    /// Look up a medicine by its scanned barcode
    pub async fn get_by_barcode(&self, barcode: &str) -> AppResult<Medicine> {
        validate_gtin13(barcode).map_err(|msg| AppError::Validation {
            field: "barcode".to_string(),
            message: msg.to_string(),
        })?;

        let row = sqlx::query_as::<_, MedicineRow>(
            "SELECT id, name, brand, barcode, ingredients, form, created_at, updated_at FROM medicines WHERE barcode = $1",
        )
        .bind(barcode)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Medicine".to_string()))?;

        row.into_medicine()
    }

    /// List the catalogue, alphabetically
    pub async fn list_medicines(&self) -> AppResult<Vec<Medicine>> {
        let rows = sqlx::query_as::<_, MedicineRow>(
            "SELECT id, name, brand, barcode, ingredients, form, created_at, updated_at FROM medicines ORDER BY name ASC",
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(MedicineRow::into_medicine).collect()
    }

    /// Update a catalogue medicine
    pub async fn update_medicine(
        &self,
        id: Uuid,
        input: UpsertMedicineInput,
    ) -> AppResult<Medicine> {
        Self::validate_input(&input)?;

        // Barcode must stay unique across the catalogue
        let clash = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM medicines WHERE barcode = $1 AND id <> $2",
        )
        .bind(&input.barcode)
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        if clash > 0 {
            return Err(AppError::DuplicateEntry("barcode".to_string()));
        }

        let ingredients = serde_json::to_value(&input.ingredients)
            .map_err(|e| AppError::Internal(format!("Ingredient serialization failed: {}", e)))?;

        let updated = sqlx::query(
            r#"
            UPDATE medicines
            SET name = $1, brand = $2, barcode = $3, ingredients = $4, form = $5, updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(&input.name)
        .bind(&input.brand)
        .bind(&input.barcode)
        .bind(&ingredients)
        .bind(&input.form)
        .bind(id)
        .execute(&self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Medicine".to_string()));
        }

        self.get_medicine(id).await
    }

    /// Delete a catalogue medicine
    pub async fn delete_medicine(&self, id: Uuid) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM medicines WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound("Medicine".to_string()));
        }
        Ok(())
    }

    /// Compare two scanned barcodes
    pub async fn compare_barcodes(
        &self,
        first_barcode: &str,
        second_barcode: &str,
    ) -> AppResult<MedicineComparison> {
        let first = self.get_by_barcode(first_barcode).await?;
        let second = self.get_by_barcode(second_barcode).await?;
        Ok(compare_medicines(&first, &second))
    }
}
