//! Logbook entry service
//!
//! Entries are soft-deleted and carry a monotonically increasing
//! `row_version` so deletions and edits propagate through delta sync.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{CaptureSource, LogbookEntry, WeeklySummary};
use shared::types::{MediaReference, PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::{validate_description, validate_entry_hours, validate_work_date};

use crate::error::{AppError, AppResult};

/// Entry service for the apprentice logbook
#[derive(Clone)]
pub struct EntryService {
    db: PgPool,
}

/// Input for creating a logbook entry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryInput {
    /// Idempotency key generated on the device; one is generated here for
    /// plain online creates that do not supply it
    pub client_entry_id: Option<Uuid>,
    pub work_date: NaiveDate,
    pub hours: Decimal,
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub source: CaptureSource,
    pub transcript: Option<String>,
    #[serde(default)]
    pub photos: Vec<MediaReference>,
}

/// Input for updating a logbook entry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryInput {
    pub work_date: Option<NaiveDate>,
    pub hours: Option<Decimal>,
    pub description: Option<String>,
    pub skills: Option<Vec<String>>,
    pub transcript: Option<String>,
    pub photos: Option<Vec<MediaReference>>,
}

/// Filter for listing entries
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub apprentice_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl EntryFilter {
    /// Date bounds as bound to the list query. An absent bound stays NULL;
    /// `NaiveDate::MIN`/`MAX` are outside Postgres's date range and must
    /// never reach a bind.
    fn date_bounds(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.from, self.to)
    }
}

/// Database row for a logbook entry
#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    org_id: Uuid,
    apprentice_id: Uuid,
    client_entry_id: Uuid,
    work_date: NaiveDate,
    hours: Decimal,
    description: String,
    skills: Vec<String>,
    source: String,
    transcript: Option<String>,
    photos: serde_json::Value,
    deleted: bool,
    row_version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EntryRow {
    fn into_entry(self) -> AppResult<LogbookEntry> {
        let source = CaptureSource::from_str(&self.source).map_err(AppError::Internal)?;
        let photos: Vec<MediaReference> = serde_json::from_value(self.photos)
            .map_err(|e| AppError::Internal(format!("Invalid photos payload: {}", e)))?;
        Ok(LogbookEntry {
            id: self.id,
            org_id: self.org_id,
            apprentice_id: self.apprentice_id,
            client_entry_id: self.client_entry_id,
            work_date: self.work_date,
            hours: self.hours,
            description: self.description,
            skills: self.skills,
            source,
            transcript: self.transcript,
            photos,
            deleted: self.deleted,
            row_version: self.row_version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Flat record shape for CSV evidence export
#[derive(Debug, Serialize)]
struct EntryCsvRecord {
    work_date: NaiveDate,
    hours: Decimal,
    description: String,
    skills: String,
    source: String,
    created_at: DateTime<Utc>,
}

const ENTRY_COLUMNS: &str = "id, org_id, apprentice_id, client_entry_id, work_date, hours, \
     description, skills, source, transcript, photos, deleted, row_version, created_at, updated_at";

impl EntryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    fn validate_input(
        work_date: NaiveDate,
        hours: Decimal,
        description: &str,
    ) -> AppResult<()> {
        validate_work_date(work_date, Utc::now().date_naive()).map_err(|msg| {
            AppError::Validation {
                field: "workDate".to_string(),
                message: msg.to_string(),
            }
        })?;
        validate_entry_hours(hours).map_err(|msg| AppError::Validation {
            field: "hours".to_string(),
            message: msg.to_string(),
        })?;
        validate_description(description).map_err(|msg| AppError::Validation {
            field: "description".to_string(),
            message: msg.to_string(),
        })?;
        Ok(())
    }

    /// Create a logbook entry.
    ///
    /// The insert is keyed on `client_entry_id`: retrying the same create
    /// (e.g. a replayed offline submission) returns the existing row rather
    /// than inserting a second one.
    pub async fn create_entry(
        &self,
        org_id: Uuid,
        apprentice_id: Uuid,
        input: CreateEntryInput,
    ) -> AppResult<LogbookEntry> {
        Self::validate_input(input.work_date, input.hours, &input.description)?;

        let client_entry_id = input.client_entry_id.unwrap_or_else(Uuid::new_v4);
        let photos = serde_json::to_value(&input.photos)
            .map_err(|e| AppError::Internal(format!("Photo serialization failed: {}", e)))?;

        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO logbook_entries
                (org_id, apprentice_id, client_entry_id, work_date, hours,
                 description, skills, source, transcript, photos)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (client_entry_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(org_id)
        .bind(apprentice_id)
        .bind(client_entry_id)
        .bind(input.work_date)
        .bind(input.hours)
        .bind(&input.description)
        .bind(&input.skills)
        .bind(input.source.as_str())
        .bind(&input.transcript)
        .bind(&photos)
        .fetch_optional(&self.db)
        .await?;

        match inserted {
            Some(id) => self.get_entry(org_id, id).await,
            // Conflict: the entry was already applied by an earlier attempt
            None => self.get_entry_by_client_id(org_id, client_entry_id).await,
        }
    }

    /// Get an entry by id
    pub async fn get_entry(&self, org_id: Uuid, entry_id: Uuid) -> AppResult<LogbookEntry> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {} FROM logbook_entries WHERE id = $1 AND org_id = $2 AND NOT deleted",
            ENTRY_COLUMNS
        ))
        .bind(entry_id)
        .bind(org_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Entry".to_string()))?;

        row.into_entry()
    }

    /// Get an entry by its client idempotency key
    pub async fn get_entry_by_client_id(
        &self,
        org_id: Uuid,
        client_entry_id: Uuid,
    ) -> AppResult<LogbookEntry> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {} FROM logbook_entries WHERE client_entry_id = $1 AND org_id = $2",
            ENTRY_COLUMNS
        ))
        .bind(client_entry_id)
        .bind(org_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Entry".to_string()))?;

        row.into_entry()
    }

    /// List entries for an apprentice (or the whole org when
    /// `filter.apprentice_id` is None), newest work date first
    pub async fn list_entries(
        &self,
        org_id: Uuid,
        filter: &EntryFilter,
    ) -> AppResult<PaginatedResponse<LogbookEntry>> {
        let pagination = Pagination {
            page: filter.page.unwrap_or(1).max(1),
            per_page: filter.per_page.unwrap_or(20).clamp(1, 100),
        };
        let (from, to) = filter.date_bounds();

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM logbook_entries
            WHERE org_id = $1 AND NOT deleted
              AND ($2::date IS NULL OR work_date >= $2)
              AND ($3::date IS NULL OR work_date <= $3)
              AND ($4::uuid IS NULL OR apprentice_id = $4)
            "#,
        )
        .bind(org_id)
        .bind(from)
        .bind(to)
        .bind(filter.apprentice_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            SELECT {} FROM logbook_entries
            WHERE org_id = $1 AND NOT deleted
              AND ($2::date IS NULL OR work_date >= $2)
              AND ($3::date IS NULL OR work_date <= $3)
              AND ($4::uuid IS NULL OR apprentice_id = $4)
            ORDER BY work_date DESC, created_at DESC
            LIMIT $5 OFFSET $6
            "#,
            ENTRY_COLUMNS
        ))
        .bind(org_id)
        .bind(from)
        .bind(to)
        .bind(filter.apprentice_id)
        .bind(pagination.per_page as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(EntryRow::into_entry)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }

    /// Update an entry's editable fields
    pub async fn update_entry(
        &self,
        org_id: Uuid,
        apprentice_id: Uuid,
        entry_id: Uuid,
        input: UpdateEntryInput,
    ) -> AppResult<LogbookEntry> {
        let existing = self.get_entry(org_id, entry_id).await?;

        // Only the apprentice who wrote an entry can change it
        if existing.apprentice_id != apprentice_id {
            return Err(AppError::InsufficientPermissions);
        }

        let work_date = input.work_date.unwrap_or(existing.work_date);
        let hours = input.hours.unwrap_or(existing.hours);
        let description = input.description.unwrap_or(existing.description);
        let skills = input.skills.unwrap_or(existing.skills);
        let transcript = input.transcript.or(existing.transcript);
        let photos = input.photos.unwrap_or(existing.photos);

        Self::validate_input(work_date, hours, &description)?;

        let photos_json = serde_json::to_value(&photos)
            .map_err(|e| AppError::Internal(format!("Photo serialization failed: {}", e)))?;

        sqlx::query(
            r#"
            UPDATE logbook_entries
            SET work_date = $1, hours = $2, description = $3, skills = $4,
                transcript = $5, photos = $6,
                row_version = nextval('entry_row_version_seq'), updated_at = NOW()
            WHERE id = $7
            "#,
        )
        .bind(work_date)
        .bind(hours)
        .bind(&description)
        .bind(&skills)
        .bind(&transcript)
        .bind(&photos_json)
        .bind(entry_id)
        .execute(&self.db)
        .await?;

        self.get_entry(org_id, entry_id).await
    }

    /// Soft-delete an entry; the row keeps advancing `row_version` so the
    /// deletion reaches other devices on their next delta pull
    pub async fn delete_entry(
        &self,
        org_id: Uuid,
        apprentice_id: Uuid,
        entry_id: Uuid,
    ) -> AppResult<()> {
        let existing = self.get_entry(org_id, entry_id).await?;

        if existing.apprentice_id != apprentice_id {
            return Err(AppError::InsufficientPermissions);
        }

        sqlx::query(
            r#"
            UPDATE logbook_entries
            SET deleted = TRUE,
                row_version = nextval('entry_row_version_seq'), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(entry_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Hours and entry counts per ISO week for the dashboard
    pub async fn weekly_summary(
        &self,
        org_id: Uuid,
        apprentice_id: Uuid,
    ) -> AppResult<Vec<WeeklySummary>> {
        #[derive(sqlx::FromRow)]
        struct SummaryRow {
            iso_year: i32,
            iso_week: i32,
            total_hours: Decimal,
            entry_count: i64,
        }

        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT EXTRACT(ISOYEAR FROM work_date)::int AS iso_year,
                   EXTRACT(WEEK FROM work_date)::int AS iso_week,
                   COALESCE(SUM(hours), 0) AS total_hours,
                   COUNT(*) AS entry_count
            FROM logbook_entries
            WHERE org_id = $1 AND apprentice_id = $2 AND NOT deleted
            GROUP BY iso_year, iso_week
            ORDER BY iso_year DESC, iso_week DESC
            "#,
        )
        .bind(org_id)
        .bind(apprentice_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| WeeklySummary {
                iso_year: r.iso_year,
                iso_week: r.iso_week as u32,
                total_hours: r.total_hours,
                entry_count: r.entry_count,
            })
            .collect())
    }

    /// Export an apprentice's entries as CSV for training review evidence
    pub async fn export_csv(&self, org_id: Uuid, apprentice_id: Uuid) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        let mut page = 1;
        loop {
            let batch = self
                .list_entries(
                    org_id,
                    &EntryFilter {
                        apprentice_id: Some(apprentice_id),
                        page: Some(page),
                        per_page: Some(100),
                        ..Default::default()
                    },
                )
                .await?;

            for entry in &batch.data {
                wtr.serialize(EntryCsvRecord {
                    work_date: entry.work_date,
                    hours: entry.hours,
                    description: entry.description.clone(),
                    skills: entry.skills.join("; "),
                    source: entry.source.as_str().to_string(),
                    created_at: entry.created_at,
                })
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
            }

            if page >= batch.pagination.total_pages {
                break;
            }
            page += 1;
        }

        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfiltered_list_binds_null_date_bounds() {
        // The export path lists with a default filter; open bounds must be
        // NULL, not min/max dates Postgres cannot represent
        let filter = EntryFilter::default();
        assert_eq!(filter.date_bounds(), (None, None));
    }

    #[test]
    fn explicit_date_bounds_pass_through() {
        let from = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        let filter = EntryFilter {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        };
        assert_eq!(filter.date_bounds(), (Some(from), Some(to)));
    }
}
