//! Queue lifecycle management.
//!
//! Validates and mutates queue records on behalf of an authenticated
//! owner. Every operation is owner-scoped; the due-queue processor
//! mutates queues through the store directly and never goes through
//! this module.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use evergreen_store::{Conflict, Post, PostStore, Queue, QueueStatus, QueueStore};

use crate::conflict::{exact_conflict, near_conflicts};
use crate::QueueError;

/// Parameters for creating a queue.
#[derive(Debug, Clone)]
pub struct CreateQueueRequest {
    pub source_post_id: String,
    pub interval_days: u32,
    pub next_due_time: DateTime<Utc>,
    pub max_executions: Option<u32>,
    /// Override the duplicate-queue check. The exact-conflict check
    /// still applies.
    pub force: bool,
}

/// Partial update for an existing queue.
#[derive(Debug, Clone, Default)]
pub struct QueueUpdate {
    pub interval_days: Option<u32>,
    pub next_due_time: Option<DateTime<Utc>>,
    pub max_executions: Option<u32>,
}

/// Validates and mutates queue records, enforcing ownership and the
/// conflict rules.
pub struct QueueLifecycle {
    queues: Arc<QueueStore>,
    posts: Arc<dyn PostStore>,
}

impl QueueLifecycle {
    /// Create a lifecycle manager over the given stores.
    pub fn new(queues: Arc<QueueStore>, posts: Arc<dyn PostStore>) -> Self {
        Self { queues, posts }
    }

    /// Create a new recurring queue for `owner`.
    ///
    /// Validation order: interval, schedule-in-past, source existence
    /// and ownership, duplicate queue (unless forced), then the
    /// non-overridable exact-conflict check.
    #[tracing::instrument(skip(self, request), fields(source_post_id = %request.source_post_id))]
    pub async fn create(
        &self,
        owner: &str,
        request: CreateQueueRequest,
    ) -> Result<Queue, QueueError> {
        if request.interval_days < 1 {
            return Err(QueueError::InvalidInterval(request.interval_days));
        }
        if request.max_executions == Some(0) {
            return Err(QueueError::InvalidMaxExecutions {
                requested: 0,
                min: 1,
            });
        }
        if request.next_due_time <= Utc::now() {
            return Err(QueueError::ScheduleInPast);
        }

        let source = self.owned_post(owner, &request.source_post_id).await?;

        if !request.force
            && let Some(existing) = self
                .queues
                .queue_for_source(owner, &request.source_post_id)
        {
            return Err(QueueError::DuplicateQueue {
                existing: Box::new(existing),
            });
        }

        let id = Uuid::new_v4().to_string();
        self.check_exact(&id, &source, request.next_due_time, owner)
            .await?;

        let queue = Queue::new(
            id,
            owner.to_string(),
            request.source_post_id,
            request.interval_days,
            request.next_due_time,
            request.max_executions,
        );
        self.queues.insert(queue.clone());
        info!(
            queue_id = %queue.id,
            source_post_id = %queue.source_post_id,
            interval_days = queue.interval_days,
            "created queue"
        );
        Ok(queue)
    }

    /// Update interval, due time, or execution bound on an owned queue.
    ///
    /// Supplying a new due time re-runs the exact-conflict check.
    pub async fn update(
        &self,
        owner: &str,
        queue_id: &str,
        update: QueueUpdate,
    ) -> Result<Queue, QueueError> {
        let queue = self.owned_queue(owner, queue_id)?;
        self.reject_completed(&queue)?;

        if let Some(days) = update.interval_days
            && days < 1
        {
            return Err(QueueError::InvalidInterval(days));
        }
        // A bound equal to the current count is allowed: the queue
        // completes on its next claim without publishing again.
        if let Some(max) = update.max_executions {
            let min = queue.execution_count.max(1);
            if max < min {
                return Err(QueueError::InvalidMaxExecutions {
                    requested: max,
                    min,
                });
            }
        }
        if let Some(next_due) = update.next_due_time {
            let source = self.owned_post(owner, &queue.source_post_id).await?;
            self.check_exact(queue_id, &source, next_due, owner).await?;
        }

        self.queues
            .modify(queue_id, |q| {
                if let Some(days) = update.interval_days {
                    q.interval_days = days;
                }
                if let Some(next_due) = update.next_due_time {
                    q.next_due_time = next_due;
                }
                if let Some(max) = update.max_executions {
                    q.max_executions = Some(max);
                }
            })
            .ok_or_else(|| QueueError::QueueNotFound(queue_id.to_string()))
    }

    /// Hard-delete an owned queue.
    pub fn delete(&self, owner: &str, queue_id: &str) -> Result<(), QueueError> {
        self.owned_queue(owner, queue_id)?;
        self.queues.remove(queue_id);
        info!(queue_id, "deleted queue");
        Ok(())
    }

    /// Pause an owned queue. Schedule fields are untouched.
    pub fn pause(&self, owner: &str, queue_id: &str) -> Result<Queue, QueueError> {
        let queue = self.owned_queue(owner, queue_id)?;
        self.reject_completed(&queue)?;

        let paused = self
            .queues
            .modify(queue_id, |q| q.status = QueueStatus::Paused)
            .ok_or_else(|| QueueError::QueueNotFound(queue_id.to_string()))?;
        info!(queue_id, "paused queue");
        Ok(paused)
    }

    /// Resume an owned queue, restarting the interval from now.
    ///
    /// Whatever cadence existed before pausing is discarded: the next
    /// due time is always one full interval from the moment of resume.
    pub fn resume(&self, owner: &str, queue_id: &str) -> Result<Queue, QueueError> {
        let queue = self.owned_queue(owner, queue_id)?;
        self.reject_completed(&queue)?;

        let resumed = self
            .queues
            .modify(queue_id, |q| {
                q.status = QueueStatus::Active;
                q.next_due_time = Utc::now() + q.interval();
            })
            .ok_or_else(|| QueueError::QueueNotFound(queue_id.to_string()))?;
        info!(queue_id, next_due_time = %resumed.next_due_time, "resumed queue");
        Ok(resumed)
    }

    /// List an owner's queues, optionally filtered by status.
    pub fn list(&self, owner: &str, status: Option<QueueStatus>) -> Vec<Queue> {
        self.queues.list_for_owner(owner, status)
    }

    /// Find an owner's existing active or paused queue for a source
    /// post, if any.
    pub fn find_duplicate(&self, owner: &str, source_post_id: &str) -> Option<Queue> {
        self.queues.queue_for_source(owner, source_post_id)
    }

    /// Compute advisory near conflicts between the owner's active
    /// queues and scheduled posts.
    ///
    /// Queues whose source post has vanished are skipped; the processor
    /// will complete them on its next run.
    pub async fn detect_conflicts(&self, owner: &str) -> Result<Vec<Conflict>, QueueError> {
        let mut pairs = Vec::new();
        for queue in self.queues.list_for_owner(owner, Some(QueueStatus::Active)) {
            if let Some(source) = self.posts.get(&queue.source_post_id).await? {
                pairs.push((queue, source));
            }
        }
        let scheduled = self.posts.scheduled_for_owner(owner).await?;
        Ok(near_conflicts(&pairs, &scheduled))
    }

    /// Run the exact-conflict check for a queue time against the
    /// owner's scheduled posts.
    async fn check_exact(
        &self,
        queue_id: &str,
        source: &Post,
        queue_time: DateTime<Utc>,
        owner: &str,
    ) -> Result<(), QueueError> {
        let scheduled = self.posts.scheduled_for_owner(owner).await?;
        if let Some(conflict) = exact_conflict(queue_id, source, queue_time, &scheduled) {
            return Err(QueueError::ExactConflict { conflict });
        }
        Ok(())
    }

    /// Fetch a queue, enforcing ownership.
    fn owned_queue(&self, owner: &str, queue_id: &str) -> Result<Queue, QueueError> {
        let queue = self
            .queues
            .get(queue_id)
            .ok_or_else(|| QueueError::QueueNotFound(queue_id.to_string()))?;
        if queue.owner_id != owner {
            return Err(QueueError::Unauthorized);
        }
        Ok(queue)
    }

    /// Fetch a post, enforcing ownership.
    async fn owned_post(&self, owner: &str, post_id: &str) -> Result<Post, QueueError> {
        let post = self
            .posts
            .get(post_id)
            .await?
            .ok_or_else(|| QueueError::PostNotFound(post_id.to_string()))?;
        if post.owner_id != owner {
            return Err(QueueError::Unauthorized);
        }
        Ok(post)
    }

    /// Completed is terminal: no mutating operation may touch it.
    fn reject_completed(&self, queue: &Queue) -> Result<(), QueueError> {
        if queue.status == QueueStatus::Completed {
            return Err(QueueError::QueueCompleted(queue.id.clone()));
        }
        Ok(())
    }
}
