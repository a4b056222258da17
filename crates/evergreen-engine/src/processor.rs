//! Periodic due-queue batch processor.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use evergreen_store::{DueClaim, QueueStatus, QueueStore};

use crate::{CadencePolicy, CloneError, EngineConfig, PostCloner};

/// Outcome of one batch run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Queues claimed as due this run.
    pub processed: usize,
    /// Queues whose clone and state advance succeeded.
    pub succeeded: usize,
    /// Queues that failed; each failure is listed in `failures`.
    pub failed: usize,
    /// Per-queue failure details.
    pub failures: Vec<QueueFailure>,
}

/// One failed work item in a batch run.
#[derive(Debug, Clone)]
pub struct QueueFailure {
    pub queue_id: String,
    pub error: String,
}

/// Scans for due queues and executes each one in isolation.
///
/// Each run claims due queues first (atomically advancing their due
/// time out of the due predicate), then processes the claims one at a
/// time. One queue's failure never aborts the others; a retryable
/// failure rolls the claim back so the next tick picks the queue up
/// again.
pub struct DueQueueProcessor {
    queues: Arc<QueueStore>,
    cloner: PostCloner,
    config: EngineConfig,
}

impl DueQueueProcessor {
    /// Create a processor over the given store and cloner.
    pub fn new(queues: Arc<QueueStore>, cloner: PostCloner, config: EngineConfig) -> Self {
        Self {
            queues,
            cloner,
            config,
        }
    }

    /// Run one batch at the current time.
    pub async fn run_once(&self) -> RunSummary {
        self.run_at(Utc::now()).await
    }

    /// Run one batch as of `now`.
    #[tracing::instrument(skip(self))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunSummary {
        let claims = self.queues.claim_due(now);
        let mut summary = RunSummary {
            processed: claims.len(),
            ..RunSummary::default()
        };

        for claim in claims {
            match self.process_claim(&claim, now).await {
                Ok(()) => summary.succeeded += 1,
                Err(error) => {
                    summary.failed += 1;
                    summary.failures.push(QueueFailure {
                        queue_id: claim.queue.id.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }

        if summary.processed > 0 {
            info!(
                processed = summary.processed,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "due-queue run complete"
            );
        }
        summary
    }

    /// Execute one claimed queue: clone the source post at the original
    /// due time, then advance the queue's state.
    async fn process_claim(&self, claim: &DueClaim, now: DateTime<Utc>) -> Result<(), CloneError> {
        let queue = &claim.queue;

        match self
            .cloner
            .clone_for_queue(&queue.source_post_id, &queue.id, claim.due_time)
            .await
        {
            Ok(clone) => {
                let cadence = self.config.cadence;
                let due_time = claim.due_time;
                let updated = self.queues.modify(&queue.id, |q| {
                    q.execution_count += 1;
                    q.last_executed_time = Some(now);
                    q.next_due_time = match cadence {
                        // Claim already anchored the due time to `now`.
                        CadencePolicy::DriftTolerant => now + q.interval(),
                        CadencePolicy::Fixed => due_time + q.interval(),
                    };
                    if q.reached_max() {
                        q.status = QueueStatus::Completed;
                    }
                });
                match updated {
                    Some(q) => debug!(
                        queue_id = %q.id,
                        clone_id = %clone.id,
                        execution_count = q.execution_count,
                        status = ?q.status,
                        "queue executed"
                    ),
                    // Deleted mid-run; the clone stands, nothing to advance.
                    None => warn!(queue_id = %queue.id, "queue vanished during processing"),
                }
                Ok(())
            }
            Err(error @ CloneError::SourceMissing(_)) => {
                // The source was deleted; no future execution can
                // succeed, so the queue completes.
                self.queues
                    .modify(&queue.id, |q| q.status = QueueStatus::Completed);
                warn!(queue_id = %queue.id, %error, "source missing, queue completed");
                Err(error)
            }
            Err(error) => {
                // Roll the claim back so the next tick retries, unless
                // the queue changed state in the meantime.
                self.queues.modify(&queue.id, |q| {
                    if q.status == QueueStatus::Active {
                        q.next_due_time = claim.due_time;
                    }
                });
                warn!(queue_id = %queue.id, %error, "queue execution failed, will retry");
                Err(error)
            }
        }
    }
}
