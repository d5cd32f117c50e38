//! Logbook entry models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::MediaReference;

/// How an entry was captured in the app
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    Voice,
    Photo,
    Manual,
}

impl CaptureSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureSource::Voice => "voice",
            CaptureSource::Photo => "photo",
            CaptureSource::Manual => "manual",
        }
    }
}

impl std::str::FromStr for CaptureSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice" => Ok(CaptureSource::Voice),
            "photo" => Ok(CaptureSource::Photo),
            "manual" => Ok(CaptureSource::Manual),
            other => Err(format!("unknown capture source: {}", other)),
        }
    }
}

/// A logbook entry recording a day's work on site.
///
/// Wire model: serialized camelCase for the apps, stored snake_case by the
/// backend. `client_entry_id` is the idempotency key generated on the device
/// that created the entry, so a retried offline submission can never create
/// a second row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogbookEntry {
    pub id: Uuid,
    pub org_id: Uuid,
    pub apprentice_id: Uuid,
    pub client_entry_id: Uuid,
    pub work_date: NaiveDate,
    pub hours: Decimal,
    pub description: String,
    /// Trade skills demonstrated, e.g. unit-standard tags
    pub skills: Vec<String>,
    pub source: CaptureSource,
    /// Transcript text when the entry was captured by voice
    pub transcript: Option<String>,
    pub photos: Vec<MediaReference>,
    pub deleted: bool,
    /// Monotonic version used for delta sync
    pub row_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-week rollup of an apprentice's logged work
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub iso_year: i32,
    pub iso_week: u32,
    pub total_hours: Decimal,
    pub entry_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_serializes_camel_case() {
        let entry = LogbookEntry {
            id: Uuid::nil(),
            org_id: Uuid::nil(),
            apprentice_id: Uuid::nil(),
            client_entry_id: Uuid::nil(),
            work_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            hours: Decimal::new(85, 1),
            description: "Framed internal walls".to_string(),
            skills: vec!["framing".to_string()],
            source: CaptureSource::Voice,
            transcript: Some("framed internal walls all day".to_string()),
            photos: vec![],
            deleted: false,
            row_version: 7,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("workDate").is_some());
        assert!(value.get("clientEntryId").is_some());
        assert!(value.get("rowVersion").is_some());
        assert!(value.get("work_date").is_none());
        assert_eq!(value["source"], json!("voice"));
    }
}
