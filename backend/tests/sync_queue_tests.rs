//! Offline queue invariant tests
//!
//! The queue is the heart of offline support: entries captured without a
//! network must each reach the backend exactly once. These tests drive the
//! state machine through arbitrary interleavings of flushes, outcomes, and
//! recoveries, and assert the no-double-submission invariant holds.

use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;
use uuid::Uuid;

use shared::sync::{OfflineQueue, QueueError, SyncStatus};

fn payload(n: usize) -> serde_json::Value {
    json!({ "description": format!("queued entry {}", n), "hours": 6 })
}

/// An action the embedder might perform against the queue
#[derive(Debug, Clone)]
enum Action {
    Flush(usize),
    Succeed(usize),
    Fail(usize),
    Recover,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (1usize..8).prop_map(Action::Flush),
        (0usize..16).prop_map(Action::Succeed),
        (0usize..16).prop_map(Action::Fail),
        Just(Action::Recover),
    ]
}

proptest! {
    /// An entry handed out by a flush is never handed out again until its
    /// outcome (success, failure, or recovery) is recorded.
    #[test]
    fn no_entry_is_handed_out_twice_while_in_flight(
        entry_count in 1usize..12,
        actions in proptest::collection::vec(action_strategy(), 1..40),
    ) {
        let mut queue = OfflineQueue::new();
        for n in 0..entry_count {
            queue.enqueue(payload(n));
        }

        let mut in_flight: HashSet<Uuid> = HashSet::new();

        for action in actions {
            match action {
                Action::Flush(limit) => {
                    let batch = queue.take_batch(limit);
                    prop_assert!(batch.len() <= limit);
                    for entry in batch {
                        // The invariant: a flush never includes an entry a
                        // previous flush still has in flight
                        prop_assert!(
                            in_flight.insert(entry.client_entry_id),
                            "entry {} handed out twice",
                            entry.client_entry_id
                        );
                    }
                }
                Action::Succeed(pick) => {
                    let picked = in_flight.iter().nth(pick % in_flight.len().max(1)).copied();
                    if let Some(id) = picked {
                        queue.mark_synced(id).unwrap();
                        in_flight.remove(&id);
                    }
                }
                Action::Fail(pick) => {
                    let picked = in_flight.iter().nth(pick % in_flight.len().max(1)).copied();
                    if let Some(id) = picked {
                        queue.mark_failed(id, "network unreachable").unwrap();
                        in_flight.remove(&id);
                    }
                }
                Action::Recover => {
                    queue.recover_in_flight();
                    in_flight.clear();
                }
            }

            prop_assert_eq!(queue.in_flight_count(), in_flight.len());
        }
    }

    /// Entries are conserved: everything enqueued is either still queued or
    /// was removed by a successful sync.
    #[test]
    fn entries_are_conserved(
        entry_count in 1usize..12,
        synced_picks in proptest::collection::vec(0usize..12, 0..12),
    ) {
        let mut queue = OfflineQueue::new();
        let ids: Vec<Uuid> = (0..entry_count).map(|n| queue.enqueue(payload(n))).collect();

        queue.take_batch(entry_count);

        let mut synced = HashSet::new();
        for pick in synced_picks {
            let id = ids[pick % ids.len()];
            if synced.insert(id) {
                queue.mark_synced(id).unwrap();
            }
        }

        prop_assert_eq!(queue.len(), entry_count - synced.len());
        for id in &ids {
            prop_assert_eq!(queue.find(*id).is_some(), !synced.contains(id));
        }
    }

    /// A snapshot taken at any point restores an equivalent queue.
    #[test]
    fn snapshot_round_trip_preserves_state(
        entry_count in 1usize..10,
        flush_limit in 0usize..10,
        fail_first in proptest::bool::ANY,
    ) {
        let mut queue = OfflineQueue::new();
        let ids: Vec<Uuid> = (0..entry_count).map(|n| queue.enqueue(payload(n))).collect();
        let batch = queue.take_batch(flush_limit);
        if fail_first {
            if let Some(first) = batch.first() {
                queue.mark_failed(first.client_entry_id, "timeout").unwrap();
            }
        }

        let restored = OfflineQueue::from_snapshot(&queue.to_snapshot()).unwrap();

        prop_assert_eq!(restored.len(), queue.len());
        prop_assert_eq!(restored.pending_count(), queue.pending_count());
        prop_assert_eq!(restored.in_flight_count(), queue.in_flight_count());
        prop_assert_eq!(restored.failed_count(), queue.failed_count());
        for id in &ids {
            let original = queue.find(*id).unwrap();
            let copy = restored.find(*id).unwrap();
            prop_assert_eq!(copy.status, original.status);
            prop_assert_eq!(copy.attempts, original.attempts);
        }
    }

    /// Failures accumulate on the attempt counter and never lose the entry.
    #[test]
    fn failed_entries_stay_eligible_for_retry(retries in 1u32..6) {
        let mut queue = OfflineQueue::new();
        let id = queue.enqueue(payload(0));

        for attempt in 1..=retries {
            let batch = queue.take_batch(1);
            prop_assert_eq!(batch.len(), 1);
            prop_assert_eq!(batch[0].client_entry_id, id);
            queue.mark_failed(id, "still offline").unwrap();
            prop_assert_eq!(queue.find(id).unwrap().attempts, attempt);
        }

        // After all those failures the entry still syncs fine
        queue.take_batch(1);
        queue.mark_synced(id).unwrap();
        prop_assert!(queue.is_empty());
    }
}

#[test]
fn outcome_for_unflushed_entry_is_rejected() {
    let mut queue = OfflineQueue::new();
    let id = queue.enqueue(payload(0));

    assert!(matches!(
        queue.mark_synced(id),
        Err(QueueError::InvalidTransition {
            from: SyncStatus::Pending,
            to: SyncStatus::Synced,
            ..
        })
    ));
    assert!(matches!(
        queue.mark_failed(id, "x"),
        Err(QueueError::InvalidTransition { .. })
    ));
}

#[test]
fn recover_after_reload_allows_reflush() {
    // Simulates a page reload mid-flush: persist, restore, recover, reflush
    let mut queue = OfflineQueue::new();
    let id = queue.enqueue(payload(0));
    queue.take_batch(1);

    let mut restored = OfflineQueue::from_snapshot(&queue.to_snapshot()).unwrap();
    assert_eq!(restored.in_flight_count(), 1);

    assert_eq!(restored.recover_in_flight(), 1);
    let batch = restored.take_batch(1);
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].client_entry_id, id);
}
