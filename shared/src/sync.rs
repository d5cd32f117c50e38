//! Offline entry queue for the logbook apps
//!
//! Entries captured while the network is down are queued locally and
//! replayed against the backend once connectivity returns. The queue is
//! pure state: persistence (localStorage in the browser, via the WASM
//! bindings) and transport are supplied by the embedder.
//!
//! Lifecycle of a queued entry:
//!
//! ```text
//! pending ──take_batch──▶ syncing ──mark_synced──▶ synced (removed)
//!    ▲                       │
//!    │ recover_in_flight     │ mark_failed
//!    └───────────────────────┼──▶ failed ──take_batch──▶ syncing ...
//! ```
//!
//! An entry handed out by `take_batch` is not handed out again until its
//! outcome is recorded, so a slow in-flight submission cannot be
//! double-submitted by a second flush.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Sync status of a locally queued entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Syncing,
    Synced,
    Failed,
}

impl SyncStatus {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: SyncStatus) -> bool {
        matches!(
            (self, next),
            (SyncStatus::Pending, SyncStatus::Syncing)
                | (SyncStatus::Failed, SyncStatus::Syncing)
                | (SyncStatus::Syncing, SyncStatus::Synced)
                | (SyncStatus::Syncing, SyncStatus::Failed)
                | (SyncStatus::Syncing, SyncStatus::Pending)
        )
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Errors from queue operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("entry {0} is not in the queue")]
    UnknownEntry(Uuid),

    #[error("entry {0} is already queued")]
    DuplicateEntry(Uuid),

    #[error("entry {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: SyncStatus,
        to: SyncStatus,
    },

    #[error("invalid queue snapshot: {0}")]
    Snapshot(String),
}

/// A locally created record waiting to reach the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedEntry {
    /// Client-generated idempotency key; the backend deduplicates on it
    pub client_entry_id: Uuid,
    /// The record as it will be submitted (camelCase JSON)
    pub payload: serde_json::Value,
    pub status: SyncStatus,
    /// Number of submission attempts that have failed
    pub attempts: u32,
    pub last_error: Option<String>,
    pub queued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory queue of entries awaiting sync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfflineQueue {
    entries: Vec<QueuedEntry>,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a new entry, generating its idempotency key
    pub fn enqueue(&mut self, payload: serde_json::Value) -> Uuid {
        let id = Uuid::new_v4();
        // A freshly generated v4 cannot collide with queued ids in practice
        self.enqueue_with_id(id, payload)
            .expect("fresh uuid already queued");
        id
    }

    /// Queue a new entry under a caller-supplied idempotency key
    pub fn enqueue_with_id(
        &mut self,
        client_entry_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<(), QueueError> {
        if self.find(client_entry_id).is_some() {
            return Err(QueueError::DuplicateEntry(client_entry_id));
        }
        let now = Utc::now();
        self.entries.push(QueuedEntry {
            client_entry_id,
            payload,
            status: SyncStatus::Pending,
            attempts: 0,
            last_error: None,
            queued_at: now,
            updated_at: now,
        });
        Ok(())
    }

    /// Take up to `limit` entries for submission, marking them in-flight.
    ///
    /// Only `Pending` and `Failed` entries are eligible; entries already
    /// `Syncing` are skipped, which is what prevents double submission.
    pub fn take_batch(&mut self, limit: usize) -> Vec<QueuedEntry> {
        let now = Utc::now();
        let mut batch = Vec::new();
        for entry in self.entries.iter_mut() {
            if batch.len() >= limit {
                break;
            }
            if matches!(entry.status, SyncStatus::Pending | SyncStatus::Failed) {
                entry.status = SyncStatus::Syncing;
                entry.updated_at = now;
                batch.push(entry.clone());
            }
        }
        batch
    }

    /// Record that the backend accepted (or already had) an entry.
    ///
    /// The entry is terminal once synced and leaves the queue.
    pub fn mark_synced(&mut self, client_entry_id: Uuid) -> Result<(), QueueError> {
        let idx = self.position(client_entry_id)?;
        let status = self.entries[idx].status;
        if !status.can_transition_to(SyncStatus::Synced) {
            return Err(QueueError::InvalidTransition {
                id: client_entry_id,
                from: status,
                to: SyncStatus::Synced,
            });
        }
        self.entries.remove(idx);
        Ok(())
    }

    /// Record a failed submission; the entry stays queued for retry
    pub fn mark_failed(
        &mut self,
        client_entry_id: Uuid,
        error: impl Into<String>,
    ) -> Result<(), QueueError> {
        let idx = self.position(client_entry_id)?;
        let entry = &mut self.entries[idx];
        if !entry.status.can_transition_to(SyncStatus::Failed) {
            return Err(QueueError::InvalidTransition {
                id: client_entry_id,
                from: entry.status,
                to: SyncStatus::Failed,
            });
        }
        entry.status = SyncStatus::Failed;
        entry.attempts += 1;
        entry.last_error = Some(error.into());
        entry.updated_at = Utc::now();
        Ok(())
    }

    /// Return entries stranded in `Syncing` (e.g. by a page reload mid-flush)
    /// to `Pending`. Returns how many were recovered.
    pub fn recover_in_flight(&mut self) -> usize {
        let now = Utc::now();
        let mut recovered = 0;
        for entry in self.entries.iter_mut() {
            if entry.status == SyncStatus::Syncing {
                entry.status = SyncStatus::Pending;
                entry.updated_at = now;
                recovered += 1;
            }
        }
        recovered
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.count(SyncStatus::Pending)
    }

    pub fn failed_count(&self) -> usize {
        self.count(SyncStatus::Failed)
    }

    pub fn in_flight_count(&self) -> usize {
        self.count(SyncStatus::Syncing)
    }

    /// All queued entries, oldest first
    pub fn entries(&self) -> &[QueuedEntry] {
        &self.entries
    }

    pub fn find(&self, client_entry_id: Uuid) -> Option<&QueuedEntry> {
        self.entries
            .iter()
            .find(|e| e.client_entry_id == client_entry_id)
    }

    /// Serialize the queue for persistence
    pub fn to_snapshot(&self) -> String {
        serde_json::to_string(self).expect("queue serialization cannot fail")
    }

    /// Restore a queue from a persisted snapshot
    pub fn from_snapshot(snapshot: &str) -> Result<Self, QueueError> {
        serde_json::from_str(snapshot).map_err(|e| QueueError::Snapshot(e.to_string()))
    }

    fn count(&self, status: SyncStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    fn position(&self, client_entry_id: Uuid) -> Result<usize, QueueError> {
        self.entries
            .iter()
            .position(|e| e.client_entry_id == client_entry_id)
            .ok_or(QueueError::UnknownEntry(client_entry_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(n: u32) -> serde_json::Value {
        json!({ "description": format!("entry {}", n), "hours": 4 })
    }

    #[test]
    fn enqueue_starts_pending() {
        let mut queue = OfflineQueue::new();
        let id = queue.enqueue(payload(1));
        assert_eq!(queue.pending_count(), 1);
        assert_eq!(queue.find(id).unwrap().status, SyncStatus::Pending);
        assert_eq!(queue.find(id).unwrap().attempts, 0);
    }

    #[test]
    fn enqueue_with_existing_id_is_rejected() {
        let mut queue = OfflineQueue::new();
        let id = queue.enqueue(payload(1));
        let err = queue.enqueue_with_id(id, payload(2)).unwrap_err();
        assert_eq!(err, QueueError::DuplicateEntry(id));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn take_batch_skips_in_flight_entries() {
        let mut queue = OfflineQueue::new();
        queue.enqueue(payload(1));
        queue.enqueue(payload(2));

        let first = queue.take_batch(10);
        assert_eq!(first.len(), 2);
        // A second flush before outcomes arrive must hand out nothing
        assert!(queue.take_batch(10).is_empty());
        assert_eq!(queue.in_flight_count(), 2);
    }

    #[test]
    fn take_batch_respects_limit() {
        let mut queue = OfflineQueue::new();
        for n in 0..5 {
            queue.enqueue(payload(n));
        }
        assert_eq!(queue.take_batch(3).len(), 3);
        assert_eq!(queue.pending_count(), 2);
        assert_eq!(queue.in_flight_count(), 3);
    }

    #[test]
    fn mark_synced_removes_entry() {
        let mut queue = OfflineQueue::new();
        let id = queue.enqueue(payload(1));
        queue.take_batch(1);
        queue.mark_synced(id).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn mark_synced_requires_in_flight() {
        let mut queue = OfflineQueue::new();
        let id = queue.enqueue(payload(1));
        let err = queue.mark_synced(id).unwrap_err();
        assert_eq!(
            err,
            QueueError::InvalidTransition {
                id,
                from: SyncStatus::Pending,
                to: SyncStatus::Synced,
            }
        );
    }

    #[test]
    fn mark_failed_keeps_entry_for_retry() {
        let mut queue = OfflineQueue::new();
        let id = queue.enqueue(payload(1));
        queue.take_batch(1);
        queue.mark_failed(id, "network unreachable").unwrap();

        let entry = queue.find(id).unwrap();
        assert_eq!(entry.status, SyncStatus::Failed);
        assert_eq!(entry.attempts, 1);
        assert_eq!(entry.last_error.as_deref(), Some("network unreachable"));

        // Failed entries are eligible for the next flush
        let retry = queue.take_batch(1);
        assert_eq!(retry.len(), 1);
        assert_eq!(retry[0].client_entry_id, id);
    }

    #[test]
    fn recover_in_flight_returns_entries_to_pending() {
        let mut queue = OfflineQueue::new();
        queue.enqueue(payload(1));
        queue.enqueue(payload(2));
        queue.take_batch(2);

        assert_eq!(queue.recover_in_flight(), 2);
        assert_eq!(queue.pending_count(), 2);
        // Idempotent: nothing left to recover
        assert_eq!(queue.recover_in_flight(), 0);
    }

    #[test]
    fn unknown_entry_is_an_error() {
        let mut queue = OfflineQueue::new();
        let id = Uuid::new_v4();
        assert_eq!(queue.mark_synced(id).unwrap_err(), QueueError::UnknownEntry(id));
        assert_eq!(
            queue.mark_failed(id, "x").unwrap_err(),
            QueueError::UnknownEntry(id)
        );
    }

    #[test]
    fn snapshot_round_trip_preserves_queue() {
        let mut queue = OfflineQueue::new();
        let a = queue.enqueue(payload(1));
        let b = queue.enqueue(payload(2));
        queue.take_batch(1);
        queue.mark_failed(a, "timeout").unwrap();

        let restored = OfflineQueue::from_snapshot(&queue.to_snapshot()).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.find(a).unwrap().status, SyncStatus::Failed);
        assert_eq!(restored.find(a).unwrap().attempts, 1);
        assert_eq!(restored.find(b).unwrap().status, SyncStatus::Pending);
    }

    #[test]
    fn bad_snapshot_is_an_error() {
        assert!(matches!(
            OfflineQueue::from_snapshot("not json"),
            Err(QueueError::Snapshot(_))
        ));
    }

    #[test]
    fn synced_is_terminal() {
        assert!(!SyncStatus::Synced.can_transition_to(SyncStatus::Pending));
        assert!(!SyncStatus::Synced.can_transition_to(SyncStatus::Syncing));
        assert!(!SyncStatus::Synced.can_transition_to(SyncStatus::Failed));
    }
}
