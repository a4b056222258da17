//! Caller-facing queue query surface.
//!
//! Thin wrapper over the lifecycle manager that resolves the
//! authenticated owner for every operation through an identity
//! provider collaborator.

use std::sync::Arc;

use async_trait::async_trait;

use evergreen_store::{Conflict, Queue, QueueStatus};

use crate::{CreateQueueRequest, QueueError, QueueLifecycle, QueueUpdate};

/// Collaborator supplying the authenticated caller's owner id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The current caller's owner id, or `Unauthenticated`.
    async fn owner_id(&self) -> Result<String, QueueError>;
}

/// Fixed identity, for the single-owner daemon and tests.
pub struct StaticIdentity(pub String);

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn owner_id(&self) -> Result<String, QueueError> {
        Ok(self.0.clone())
    }
}

/// The queue operations exposed to callers.
pub struct QueueService {
    lifecycle: QueueLifecycle,
    identity: Arc<dyn IdentityProvider>,
}

impl QueueService {
    /// Create a service over the lifecycle manager and identity
    /// provider.
    pub fn new(lifecycle: QueueLifecycle, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            lifecycle,
            identity,
        }
    }

    /// Create a recurring queue for the caller.
    pub async fn create_queue(&self, request: CreateQueueRequest) -> Result<Queue, QueueError> {
        let owner = self.identity.owner_id().await?;
        self.lifecycle.create(&owner, request).await
    }

    /// Update one of the caller's queues.
    pub async fn update_queue(
        &self,
        queue_id: &str,
        update: QueueUpdate,
    ) -> Result<Queue, QueueError> {
        let owner = self.identity.owner_id().await?;
        self.lifecycle.update(&owner, queue_id, update).await
    }

    /// Delete one of the caller's queues.
    pub async fn delete_queue(&self, queue_id: &str) -> Result<(), QueueError> {
        let owner = self.identity.owner_id().await?;
        self.lifecycle.delete(&owner, queue_id)
    }

    /// Pause one of the caller's queues.
    pub async fn pause_queue(&self, queue_id: &str) -> Result<Queue, QueueError> {
        let owner = self.identity.owner_id().await?;
        self.lifecycle.pause(&owner, queue_id)
    }

    /// Resume one of the caller's queues, restarting its interval.
    pub async fn resume_queue(&self, queue_id: &str) -> Result<Queue, QueueError> {
        let owner = self.identity.owner_id().await?;
        self.lifecycle.resume(&owner, queue_id)
    }

    /// List the caller's queues, optionally filtered by status.
    pub async fn list_queues(&self, status: Option<QueueStatus>) -> Result<Vec<Queue>, QueueError> {
        let owner = self.identity.owner_id().await?;
        Ok(self.lifecycle.list(&owner, status))
    }

    /// Check whether the caller already has a queue targeting a source
    /// post.
    pub async fn check_duplicate_queue(
        &self,
        source_post_id: &str,
    ) -> Result<Option<Queue>, QueueError> {
        let owner = self.identity.owner_id().await?;
        Ok(self.lifecycle.find_duplicate(&owner, source_post_id))
    }

    /// Advisory near-conflict report for the caller's active queues.
    pub async fn detect_scheduling_conflicts(&self) -> Result<Vec<Conflict>, QueueError> {
        let owner = self.identity.owner_id().await?;
        self.lifecycle.detect_conflicts(&owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::collections::BTreeMap;

    use evergreen_store::{MemoryPostStore, Platform, PlatformTarget, Post, PostStore, QueueStore};

    /// Identity provider with no caller.
    struct Anonymous;

    #[async_trait]
    impl IdentityProvider for Anonymous {
        async fn owner_id(&self) -> Result<String, QueueError> {
            Err(QueueError::Unauthenticated)
        }
    }

    async fn service_with(identity: Arc<dyn IdentityProvider>) -> (Arc<MemoryPostStore>, QueueService) {
        let queues = Arc::new(QueueStore::new());
        let posts = Arc::new(MemoryPostStore::new());
        let lifecycle = QueueLifecycle::new(queues, posts.clone());
        (posts, QueueService::new(lifecycle, identity))
    }

    async fn seed_post(posts: &MemoryPostStore, owner: &str) -> String {
        let mut targets = BTreeMap::new();
        targets.insert(Platform::Twitter, PlatformTarget::with_content("content"));
        posts.insert(Post::new(owner, targets)).await.unwrap()
    }

    #[tokio::test]
    async fn test_operations_scoped_to_identity() {
        let (posts, service) = service_with(Arc::new(StaticIdentity("alice".to_string()))).await;
        let source = seed_post(&posts, "alice").await;

        let queue = service
            .create_queue(CreateQueueRequest {
                source_post_id: source.clone(),
                interval_days: 7,
                next_due_time: Utc::now() + Duration::hours(1),
                max_executions: None,
                force: false,
            })
            .await
            .unwrap();
        assert_eq!(queue.owner_id, "alice");

        let listed = service.list_queues(None).await.unwrap();
        assert_eq!(listed.len(), 1);

        let duplicate = service.check_duplicate_queue(&source).await.unwrap();
        assert_eq!(duplicate.unwrap().id, queue.id);

        service.pause_queue(&queue.id).await.unwrap();
        service.resume_queue(&queue.id).await.unwrap();
        service.delete_queue(&queue.id).await.unwrap();
        assert!(service.list_queues(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unauthenticated_caller_rejected() {
        let (posts, service) = service_with(Arc::new(Anonymous)).await;
        let source = seed_post(&posts, "alice").await;

        let err = service
            .create_queue(CreateQueueRequest {
                source_post_id: source,
                interval_days: 7,
                next_due_time: Utc::now() + Duration::hours(1),
                max_executions: None,
                force: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Unauthenticated));

        assert!(matches!(
            service.list_queues(None).await.unwrap_err(),
            QueueError::Unauthenticated
        ));
        assert!(matches!(
            service.detect_scheduling_conflicts().await.unwrap_err(),
            QueueError::Unauthenticated
        ));
    }
}
