//! Post cloning for queue executions.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use evergreen_store::{PlatformTarget, Post, PostStore, PublishScheduler};

use crate::CloneError;

/// Creates the post record for one queue execution and requests a
/// deferred publish per enabled platform.
pub struct PostCloner {
    posts: Arc<dyn PostStore>,
    scheduler: Arc<dyn PublishScheduler>,
}

impl PostCloner {
    /// Create a cloner over the given collaborators.
    pub fn new(posts: Arc<dyn PostStore>, scheduler: Arc<dyn PublishScheduler>) -> Self {
        Self { posts, scheduler }
    }

    /// Clone `source_post_id` for one execution of `queue_id`,
    /// scheduling every enabled platform at `target_time`.
    ///
    /// Inserts exactly one new post: content copied per enabled
    /// platform, scheduled times set to the target, publish-result
    /// fields cleared, and back-references to the queue and source.
    #[tracing::instrument(skip(self))]
    pub async fn clone_for_queue(
        &self,
        source_post_id: &str,
        queue_id: &str,
        target_time: DateTime<Utc>,
    ) -> Result<Post, CloneError> {
        let source = self
            .posts
            .get(source_post_id)
            .await?
            .ok_or_else(|| CloneError::SourceMissing(source_post_id.to_string()))?;

        let mut targets = BTreeMap::new();
        for (platform, target) in &source.targets {
            if !target.is_enabled() {
                continue;
            }
            targets.insert(
                *platform,
                PlatformTarget {
                    content: target.content.clone(),
                    scheduled_time: Some(target_time),
                    platform_post_id: None,
                    scheduler_handle: None,
                },
            );
        }
        if targets.is_empty() {
            return Err(CloneError::NoPlatformContent(source_post_id.to_string()));
        }

        let mut clone = Post {
            id: Uuid::new_v4().to_string(),
            owner_id: source.owner_id.clone(),
            targets,
            created_by_queue_id: Some(queue_id.to_string()),
            cloned_from_post_id: Some(source.id.clone()),
            created_at: Utc::now(),
        };
        let clone_id = self.posts.insert(clone.clone()).await?;

        let platforms: Vec<_> = clone.targets.keys().copied().collect();
        for platform in platforms {
            let handle = self
                .scheduler
                .schedule_at(target_time, &clone_id, platform)
                .await?;
            self.posts
                .attach_handle(&clone_id, platform, handle.clone())
                .await?;
            if let Some(target) = clone.targets.get_mut(&platform) {
                target.scheduler_handle = Some(handle);
            }
        }

        debug!(
            clone_id = %clone.id,
            platforms = clone.targets.len(),
            %target_time,
            "cloned post for queue execution"
        );
        Ok(clone)
    }
}
