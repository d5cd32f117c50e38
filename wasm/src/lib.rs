//! WebAssembly module for the Sitebook browser apps
//!
//! Provides client-side support for:
//! - The offline entry queue (pending/syncing/failed lifecycle, persisted
//!   to localStorage as a JSON snapshot by the embedder)
//! - Offline validation, so a record rejected offline is rejected for the
//!   same reason the server would reject it
//! - Barcode checks and medicine comparison for the scanner screen

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

use shared::models::{compare_medicines, Medicine};
use shared::sync::OfflineQueue;
use shared::validation;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_id(id: &str) -> Result<Uuid, JsValue> {
    Uuid::parse_str(id).map_err(|_| JsValue::from_str("invalid entry id"))
}

/// Offline entry queue, exposed to the browser apps.
///
/// Payloads cross the JS boundary as JSON strings; the embedder persists
/// `snapshot()` to localStorage and calls `restore` + `recover_in_flight`
/// on page load.
#[wasm_bindgen]
pub struct EntryQueue {
    inner: OfflineQueue,
}

#[wasm_bindgen]
impl EntryQueue {
    #[wasm_bindgen(constructor)]
    pub fn new() -> EntryQueue {
        EntryQueue {
            inner: OfflineQueue::new(),
        }
    }

    /// Restore a queue from a persisted snapshot
    pub fn restore(snapshot: &str) -> Result<EntryQueue, JsValue> {
        let inner = OfflineQueue::from_snapshot(snapshot).map_err(js_err)?;
        Ok(EntryQueue { inner })
    }

    /// Queue a new entry; returns its client entry id
    pub fn enqueue(&mut self, payload_json: &str) -> Result<String, JsValue> {
        let payload: serde_json::Value = serde_json::from_str(payload_json)
            .map_err(|e| JsValue::from_str(&format!("invalid payload JSON: {}", e)))?;
        Ok(self.inner.enqueue(payload).to_string())
    }

    /// Take up to `limit` entries for submission, marking them in-flight.
    /// Returns a JSON array of queued entries.
    pub fn take_batch(&mut self, limit: usize) -> Result<String, JsValue> {
        let batch = self.inner.take_batch(limit);
        serde_json::to_string(&batch).map_err(js_err)
    }

    /// Record that the backend accepted (or already had) an entry
    pub fn mark_synced(&mut self, client_entry_id: &str) -> Result<(), JsValue> {
        let id = parse_id(client_entry_id)?;
        self.inner.mark_synced(id).map_err(js_err)
    }

    /// Record a failed submission; the entry stays queued for retry
    pub fn mark_failed(&mut self, client_entry_id: &str, error: &str) -> Result<(), JsValue> {
        let id = parse_id(client_entry_id)?;
        self.inner.mark_failed(id, error).map_err(js_err)
    }

    /// Return entries stranded in-flight (e.g. by a reload mid-flush) to
    /// pending; returns how many were recovered
    pub fn recover_in_flight(&mut self) -> usize {
        self.inner.recover_in_flight()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending_count()
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight_count()
    }

    pub fn failed_count(&self) -> usize {
        self.inner.failed_count()
    }

    /// Serialize the queue for persistence
    pub fn snapshot(&self) -> String {
        self.inner.to_snapshot()
    }
}

impl Default for EntryQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a logbook entry before it is queued. Returns the first error
/// message, or null when the entry is valid.
#[wasm_bindgen]
pub fn validate_entry(
    hours: f64,
    work_date: &str,
    today: &str,
    description: &str,
) -> Option<String> {
    let hours = match Decimal::try_from(hours) {
        Ok(h) => h,
        Err(_) => return Some("Hours must be a number".to_string()),
    };
    if let Err(msg) = validation::validate_entry_hours(hours) {
        return Some(msg.to_string());
    }

    let work_date = match NaiveDate::parse_from_str(work_date, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => return Some("Work date must be YYYY-MM-DD".to_string()),
    };
    let today = match NaiveDate::parse_from_str(today, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => return Some("Today must be YYYY-MM-DD".to_string()),
    };
    if let Err(msg) = validation::validate_work_date(work_date, today) {
        return Some(msg.to_string());
    }

    if let Err(msg) = validation::validate_description(description) {
        return Some(msg.to_string());
    }

    None
}

/// Whether a scanned barcode is a valid GTIN-13
#[wasm_bindgen]
pub fn is_valid_gtin13(barcode: &str) -> bool {
    validation::validate_gtin13(barcode).is_ok()
}

/// Compute the GTIN-13 check digit for a 12-digit prefix
#[wasm_bindgen]
pub fn gtin13_check_digit(prefix: &str) -> Option<u32> {
    validation::gtin13_check_digit(prefix)
}

/// Compare two medicines (as JSON) the way the scanner screen does.
/// Returns the comparison result as JSON.
#[wasm_bindgen]
pub fn compare_medicines_json(first_json: &str, second_json: &str) -> Result<String, JsValue> {
    let first: Medicine = serde_json::from_str(first_json)
        .map_err(|e| JsValue::from_str(&format!("invalid first medicine: {}", e)))?;
    let second: Medicine = serde_json::from_str(second_json)
        .map_err(|e| JsValue::from_str(&format!("invalid second medicine: {}", e)))?;

    let comparison = compare_medicines(&first, &second);
    serde_json::to_string(&comparison).map_err(js_err)
}

/// Validate a listing price before submission. Returns the error message,
/// or null when valid.
#[wasm_bindgen]
pub fn validate_listing_price(price: f64) -> Option<String> {
    let price = match Decimal::try_from(price) {
        Ok(p) => p.normalize(),
        Err(_) => return Some("Price must be a number".to_string()),
    };
    validation::validate_listing_price(price).err().map(String::from)
}

/// Validate a listing quantity. Returns the error message, or null when valid.
#[wasm_bindgen]
pub fn validate_listing_quantity(quantity: i32) -> Option<String> {
    validation::validate_quantity(quantity).err().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn queue_round_trip_through_json_boundary() {
        let mut queue = EntryQueue::new();
        let id = queue
            .enqueue(r#"{"description":"Hung gib board","hours":6}"#)
            .unwrap();

        let batch: serde_json::Value =
            serde_json::from_str(&queue.take_batch(10).unwrap()).unwrap();
        assert_eq!(batch.as_array().unwrap().len(), 1);
        assert_eq!(batch[0]["clientEntryId"], json!(id));
        assert_eq!(batch[0]["status"], json!("syncing"));

        queue.mark_synced(&id).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn snapshot_restore_recovers_in_flight() {
        let mut queue = EntryQueue::new();
        queue
            .enqueue(r#"{"description":"Boxing for footings","hours":8}"#)
            .unwrap();
        queue.take_batch(1).unwrap();

        let mut restored = EntryQueue::restore(&queue.snapshot()).unwrap();
        assert_eq!(restored.in_flight_count(), 1);
        assert_eq!(restored.recover_in_flight(), 1);
        assert_eq!(restored.pending_count(), 1);
    }

    #[test]
    fn rejects_bad_payload_and_bad_id() {
        let mut queue = EntryQueue::new();
        assert!(queue.enqueue("not json").is_err());
        assert!(queue.mark_synced("not-a-uuid").is_err());
    }

    #[test]
    fn entry_validation_messages() {
        assert!(validate_entry(8.0, "2026-03-02", "2026-03-02", "Set out framing").is_none());
        assert!(validate_entry(0.0, "2026-03-02", "2026-03-02", "work").is_some());
        assert!(validate_entry(8.0, "2026-03-03", "2026-03-02", "work").is_some());
        assert!(validate_entry(8.0, "2026-03-02", "2026-03-02", "   ").is_some());
        assert!(validate_entry(8.0, "03/02/2026", "2026-03-02", "work").is_some());
    }

    #[test]
    fn gtin_helpers() {
        assert!(is_valid_gtin13("9400547001231"));
        assert!(!is_valid_gtin13("9400547001234"));
        assert_eq!(gtin13_check_digit("940054700123"), Some(1));
        assert_eq!(gtin13_check_digit("94005470012"), None);
    }

    #[test]
    fn listing_validation() {
        assert!(validate_listing_price(49.99).is_none());
        assert!(validate_listing_price(0.0).is_some());
        assert!(validate_listing_quantity(3).is_none());
        assert!(validate_listing_quantity(0).is_some());
    }
}
