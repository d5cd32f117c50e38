//! Offline sync service for the logbook apps
//!
//! The client replays its offline queue here. Each queued item is the
//! creation of a client-owned entry keyed by `client_entry_id`, so applying
//! is idempotent: a replayed item reports `duplicate` instead of inserting a
//! second row. Devices pull changes (including soft deletes) by
//! `row_version` delta.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{CaptureSource, LogbookEntry};
use shared::types::MediaReference;
use shared::validation::{validate_description, validate_entry_hours, validate_work_date};

use crate::error::{AppError, AppResult};

/// Sync service for offline support
#[derive(Clone)]
pub struct SyncService {
    db: PgPool,
}

/// A queued entry submitted by the client
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEntry {
    pub client_entry_id: Uuid,
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

/// Outcome of applying one queued entry
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// Inserted as a new row
    #[serde(rename_all = "camelCase")]
    Applied { entry_id: Uuid },
    /// Already applied by an earlier attempt; no new row
    #[serde(rename_all = "camelCase")]
    Duplicate { entry_id: Uuid },
    /// Failed validation; the client should surface it, not retry
    Rejected { reason: String },
}

/// Per-item result of a batch apply
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub client_entry_id: Uuid,
    #[serde(flatten)]
    pub outcome: ApplyOutcome,
}

/// Result of applying a batch of queued entries
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub results: Vec<ApplyResult>,
    pub server_version: i64,
}

/// Sync state for a device
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub user_id: Uuid,
    pub device_id: String,
    pub last_sync_at: DateTime<Utc>,
    pub last_sync_version: i64,
}

/// Validate a queued entry the way a direct create would be validated.
/// Pure so rejection rules can be tested without a database.
pub fn validate_pending(entry: &PendingEntry, today: NaiveDate) -> Result<(), String> {
    validate_work_date(entry.work_date, today).map_err(str::to_string)?;
    validate_entry_hours(entry.hours).map_err(str::to_string)?;
    validate_description(&entry.description).map_err(str::to_string)?;
    Ok(())
}

impl SyncService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get changed entries since a version for delta sync.
    ///
    /// The delta covers the whole org; `apprentice_id` restricts it to one
    /// author for devices that only hold that apprentice's entries.
    /// Soft-deleted entries are included so other devices can drop them.
    pub async fn get_changes_since(
        &self,
        org_id: Uuid,
        apprentice_id: Option<Uuid>,
        since_version: i64,
        limit: i64,
    ) -> AppResult<Vec<LogbookEntry>> {
        let rows = sqlx::query_as::<_, row::EntryRow>(
            r#"
            SELECT id, org_id, apprentice_id, client_entry_id, work_date, hours,
                   description, skills, source, transcript, photos, deleted,
                   row_version, created_at, updated_at
            FROM logbook_entries
            WHERE org_id = $1
              AND ($2::uuid IS NULL OR apprentice_id = $2)
              AND row_version > $3
            ORDER BY row_version ASC
            LIMIT $4
            "#,
        )
        .bind(org_id)
        .bind(apprentice_id)
        .bind(since_version)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(row::EntryRow::into_entry).collect()
    }

    /// Current high-water row version for an org
    pub async fn server_version(&self, org_id: Uuid) -> AppResult<i64> {
        let version: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(row_version), 0) FROM logbook_entries WHERE org_id = $1",
        )
        .bind(org_id)
        .fetch_one(&self.db)
        .await?;
        Ok(version)
    }

    /// Get current sync state for a device
    pub async fn get_sync_state(
        &self,
        user_id: Uuid,
        device_id: &str,
    ) -> AppResult<Option<SyncState>> {
        let state = sqlx::query_as::<_, SyncState>(
            "SELECT user_id, device_id, last_sync_at, last_sync_version FROM sync_state WHERE user_id = $1 AND device_id = $2",
        )
        .bind(user_id)
        .bind(device_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(state)
    }

    /// Update sync state after successful sync
    pub async fn update_sync_state(
        &self,
        user_id: Uuid,
        device_id: &str,
        version: i64,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_state (user_id, device_id, last_sync_at, last_sync_version)
            VALUES ($1, $2, NOW(), $3)
            ON CONFLICT (user_id, device_id)
            DO UPDATE SET last_sync_at = NOW(), last_sync_version = $3
            "#,
        )
        .bind(user_id)
        .bind(device_id)
        .bind(version)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Apply a batch of queued entries from a client, idempotently
    pub async fn apply_batch(
        &self,
        org_id: Uuid,
        apprentice_id: Uuid,
        batch: Vec<PendingEntry>,
    ) -> AppResult<SyncResult> {
        let today = Utc::now().date_naive();
        let mut results = Vec::with_capacity(batch.len());

        for pending in batch {
            let client_entry_id = pending.client_entry_id;
            let outcome = self
                .apply_single(org_id, apprentice_id, pending, today)
                .await?;
            results.push(ApplyResult {
                client_entry_id,
                outcome,
            });
        }

        let server_version = self.server_version(org_id).await?;

        Ok(SyncResult {
            results,
            server_version,
        })
    }

    /// Apply one queued entry, classifying the result
    async fn apply_single(
        &self,
        org_id: Uuid,
        apprentice_id: Uuid,
        pending: PendingEntry,
        today: NaiveDate,
    ) -> AppResult<ApplyOutcome> {
        if let Err(reason) = validate_pending(&pending, today) {
            return Ok(ApplyOutcome::Rejected { reason });
        }

        let photos = serde_json::to_value(&pending.photos)
            .map_err(|e| AppError::Internal(format!("Photo serialization failed: {}", e)))?;

        // Insert keyed on the client idempotency key; a replayed item hits
        // the conflict arm and no second row exists
        let inserted: Option<Uuid> = sqlx::query_scalar(
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
        .bind(pending.client_entry_id)
        .bind(pending.work_date)
        .bind(pending.hours)
        .bind(&pending.description)
        .bind(&pending.skills)
        .bind(pending.source.as_str())
        .bind(&pending.transcript)
        .bind(&photos)
        .fetch_optional(&self.db)
        .await?;

        if let Some(entry_id) = inserted {
            return Ok(ApplyOutcome::Applied { entry_id });
        }

        let entry_id: Uuid = sqlx::query_scalar(
            "SELECT id FROM logbook_entries WHERE client_entry_id = $1 AND org_id = $2",
        )
        .bind(pending.client_entry_id)
        .bind(org_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Entry".to_string()))?;

        Ok(ApplyOutcome::Duplicate { entry_id })
    }
}

mod row {
    use super::*;
    use std::str::FromStr;

    /// Row shape shared with the entry service's queries
    #[derive(Debug, sqlx::FromRow)]
    pub(super) struct EntryRow {
        pub id: Uuid,
        pub org_id: Uuid,
        pub apprentice_id: Uuid,
        pub client_entry_id: Uuid,
        pub work_date: NaiveDate,
        pub hours: Decimal,
        pub description: String,
        pub skills: Vec<String>,
        pub source: String,
        pub transcript: Option<String>,
        pub photos: serde_json::Value,
        pub deleted: bool,
        pub row_version: i64,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl EntryRow {
        pub(super) fn into_entry(self) -> AppResult<LogbookEntry> {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending(hours: i64, date: NaiveDate, description: &str) -> PendingEntry {
        PendingEntry {
            client_entry_id: Uuid::new_v4(),
            work_date: date,
            hours: Decimal::from(hours),
            description: description.to_string(),
            skills: vec![],
            source: CaptureSource::Manual,
            transcript: None,
            photos: vec![],
        }
    }

    #[test]
    fn valid_pending_entry_passes() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let entry = pending(8, today, "Set boxing for footings");
        assert!(validate_pending(&entry, today).is_ok());
    }

    #[test]
    fn future_dated_entry_is_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let entry = pending(8, today.succ_opt().unwrap(), "work");
        assert!(validate_pending(&entry, today).is_err());
    }

    #[test]
    fn empty_description_is_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let entry = pending(8, today, "   ");
        assert!(validate_pending(&entry, today).is_err());
    }

    #[test]
    fn apply_outcome_wire_shape() {
        let id = Uuid::nil();
        let result = ApplyResult {
            client_entry_id: id,
            outcome: ApplyOutcome::Duplicate { entry_id: id },
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], json!("duplicate"));
        assert!(value.get("entryId").is_some());
        assert!(value.get("clientEntryId").is_some());
    }
}
