//! In-memory queue store with per-record atomic updates.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::{Queue, QueueStatus};

/// Durable table of queue records.
///
/// Backed by a [`DashMap`], which gives the per-record atomic
/// read-modify-write the processor relies on: an entry is locked while
/// it is being claimed or modified, and no global transaction spans
/// multiple queues. The query methods stand in for the owner+status and
/// status+due-time indexes a database-backed store would carry.
#[derive(Debug, Default)]
pub struct QueueStore {
    queues: DashMap<String, Queue>,
}

/// A due queue claimed for processing.
///
/// `queue` is the record snapshot taken at claim time, before the due
/// time was advanced; `due_time` is the original due time the execution
/// should target.
#[derive(Debug, Clone)]
pub struct DueClaim {
    pub queue: Queue,
    pub due_time: DateTime<Utc>,
}

impl QueueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a queue record.
    pub fn insert(&self, queue: Queue) {
        self.queues.insert(queue.id.clone(), queue);
    }

    /// Fetch a queue by id.
    pub fn get(&self, id: &str) -> Option<Queue> {
        self.queues.get(id).map(|entry| entry.value().clone())
    }

    /// Hard-delete a queue. Returns the removed record, if any.
    pub fn remove(&self, id: &str) -> Option<Queue> {
        self.queues.remove(id).map(|(_, queue)| queue)
    }

    /// Atomically read-modify-write a single queue record.
    ///
    /// Returns the updated record, or `None` if it does not exist.
    pub fn modify<F>(&self, id: &str, f: F) -> Option<Queue>
    where
        F: FnOnce(&mut Queue),
    {
        let mut entry = self.queues.get_mut(id)?;
        f(entry.value_mut());
        Some(entry.value().clone())
    }

    /// All queues for an owner, optionally filtered by status.
    ///
    /// Results are ordered by creation time for stable listings.
    pub fn list_for_owner(&self, owner_id: &str, status: Option<QueueStatus>) -> Vec<Queue> {
        let mut queues: Vec<Queue> = self
            .queues
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .filter(|entry| status.is_none_or(|s| entry.status == s))
            .map(|entry| entry.value().clone())
            .collect();
        queues.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        queues
    }

    /// Find an owner's active or paused queue already targeting a source
    /// post. Completed queues do not count as duplicates.
    pub fn queue_for_source(&self, owner_id: &str, source_post_id: &str) -> Option<Queue> {
        self.queues
            .iter()
            .find(|entry| {
                entry.owner_id == owner_id
                    && entry.source_post_id == source_post_id
                    && matches!(entry.status, QueueStatus::Active | QueueStatus::Paused)
            })
            .map(|entry| entry.value().clone())
    }

    /// Claim every queue that is due at `now`.
    ///
    /// While the entry is held, the due time is advanced one interval
    /// past `now`, which removes the record from the due predicate. An
    /// overlapping run calling `claim_due` with the same `now` therefore
    /// cannot claim the same queue twice. The caller finalizes the
    /// record after processing, or rolls the due time back on a
    /// retryable failure.
    ///
    /// A due queue whose execution bound is already met is completed in
    /// place rather than claimed, so `execution_count` never exceeds
    /// `max_executions`.
    pub fn claim_due(&self, now: DateTime<Utc>) -> Vec<DueClaim> {
        let mut claims = Vec::new();
        for mut entry in self.queues.iter_mut() {
            if !entry.is_due(now) {
                continue;
            }
            if entry.reached_max() {
                entry.status = QueueStatus::Completed;
                debug!(queue_id = %entry.id, "execution bound met, completed without claiming");
                continue;
            }
            let snapshot = entry.value().clone();
            let due_time = snapshot.next_due_time;
            entry.next_due_time = now + entry.interval();
            debug!(queue_id = %snapshot.id, %due_time, "claimed due queue");
            claims.push(DueClaim {
                queue: snapshot,
                due_time,
            });
        }
        // Stable processing order: oldest due first.
        claims.sort_by(|a, b| a.due_time.cmp(&b.due_time).then(a.queue.id.cmp(&b.queue.id)));
        claims
    }

    /// Number of stored queues.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn queue(id: &str, owner: &str, source: &str, due_offset_secs: i64) -> Queue {
        Queue::new(
            id.to_string(),
            owner.to_string(),
            source.to_string(),
            1,
            Utc::now() + Duration::seconds(due_offset_secs),
            None,
        )
    }

    #[test]
    fn test_insert_get_remove() {
        let store = QueueStore::new();
        store.insert(queue("q1", "owner", "p1", 3600));

        assert!(store.get("q1").is_some());
        assert!(store.get("q2").is_none());

        let removed = store.remove("q1").unwrap();
        assert_eq!(removed.id, "q1");
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_for_owner_filters_status() {
        let store = QueueStore::new();
        store.insert(queue("q1", "alice", "p1", 3600));
        store.insert(queue("q2", "alice", "p2", 3600));
        store.insert(queue("q3", "bob", "p3", 3600));
        store.modify("q2", |q| q.status = QueueStatus::Paused);

        assert_eq!(store.list_for_owner("alice", None).len(), 2);
        let active = store.list_for_owner("alice", Some(QueueStatus::Active));
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "q1");
        assert_eq!(store.list_for_owner("bob", None).len(), 1);
    }

    #[test]
    fn test_queue_for_source_ignores_completed() {
        let store = QueueStore::new();
        store.insert(queue("q1", "alice", "p1", 3600));

        assert!(store.queue_for_source("alice", "p1").is_some());
        assert!(store.queue_for_source("bob", "p1").is_none());

        store.modify("q1", |q| q.status = QueueStatus::Completed);
        assert!(store.queue_for_source("alice", "p1").is_none());
    }

    #[test]
    fn test_claim_due_advances_due_time() {
        let store = QueueStore::new();
        store.insert(queue("q1", "alice", "p1", -60));
        store.insert(queue("q2", "alice", "p2", 3600));

        let now = Utc::now();
        let claims = store.claim_due(now);
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].queue.id, "q1");
        assert!(claims[0].due_time <= now);

        // Claimed queue is out of the due predicate.
        let stored = store.get("q1").unwrap();
        assert!(stored.next_due_time > now);
        assert!(store.claim_due(now).is_empty());
    }

    #[test]
    fn test_claim_due_skips_paused_and_completed() {
        let store = QueueStore::new();
        store.insert(queue("q1", "alice", "p1", -60));
        store.insert(queue("q2", "alice", "p2", -60));
        store.modify("q1", |q| q.status = QueueStatus::Paused);
        store.modify("q2", |q| q.status = QueueStatus::Completed);

        assert!(store.claim_due(Utc::now()).is_empty());
    }

    #[test]
    fn test_claim_due_completes_queue_at_bound() {
        let store = QueueStore::new();
        store.insert(queue("q0", "alice", "p1", -60));
        store.modify("q0", |q| q.max_executions = Some(0));
        store.insert(queue("q1", "alice", "p2", -60));
        store.modify("q1", |q| {
            q.max_executions = Some(2);
            q.execution_count = 2;
        });

        assert!(store.claim_due(Utc::now()).is_empty());

        let zero_bound = store.get("q0").unwrap();
        assert_eq!(zero_bound.status, QueueStatus::Completed);
        assert_eq!(zero_bound.execution_count, 0);
        assert_eq!(store.get("q1").unwrap().status, QueueStatus::Completed);
    }

    #[test]
    fn test_claim_due_orders_oldest_first() {
        let store = QueueStore::new();
        store.insert(queue("newer", "alice", "p1", -60));
        store.insert(queue("older", "alice", "p2", -600));

        let claims = store.claim_due(Utc::now());
        let ids: Vec<&str> = claims.iter().map(|c| c.queue.id.as_str()).collect();
        assert_eq!(ids, vec!["older", "newer"]);
    }

    #[test]
    fn test_modify_returns_updated_snapshot() {
        let store = QueueStore::new();
        store.insert(queue("q1", "alice", "p1", 3600));

        let updated = store
            .modify("q1", |q| q.execution_count += 1)
            .unwrap();
        assert_eq!(updated.execution_count, 1);
        assert!(store.modify("missing", |_| {}).is_none());
    }
}
