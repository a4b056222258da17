//! Post store collaborator contract and in-memory implementation.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{Platform, Post, SchedulerHandle, StoreError};

/// Collaborator contract for the external post store.
///
/// The engine reads source posts, inserts clones, and patches publish
/// handles onto them; it never owns the post lifecycle.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Fetch a post by id. `Ok(None)` means the post does not exist.
    async fn get(&self, post_id: &str) -> Result<Option<Post>, StoreError>;

    /// Insert a new post, returning its id.
    async fn insert(&self, post: Post) -> Result<String, StoreError>;

    /// Patch the scheduler handle onto one platform target of a post.
    async fn attach_handle(
        &self,
        post_id: &str,
        platform: Platform,
        handle: SchedulerHandle,
    ) -> Result<(), StoreError>;

    /// All of an owner's posts with at least one scheduled publish time.
    async fn scheduled_for_owner(&self, owner_id: &str) -> Result<Vec<Post>, StoreError>;
}

/// In-memory post store used by the daemon and tests.
#[derive(Debug, Default)]
pub struct MemoryPostStore {
    posts: DashMap<String, Post>,
}

impl MemoryPostStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored posts.
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// All posts cloned by the given queue, oldest first.
    pub fn clones_of_queue(&self, queue_id: &str) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| entry.created_by_queue_id.as_deref() == Some(queue_id))
            .map(|entry| entry.value().clone())
            .collect();
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        posts
    }

    /// Remove a post, for simulating source deletion in tests.
    pub fn remove(&self, post_id: &str) -> Option<Post> {
        self.posts.remove(post_id).map(|(_, post)| post)
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn get(&self, post_id: &str) -> Result<Option<Post>, StoreError> {
        Ok(self.posts.get(post_id).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, post: Post) -> Result<String, StoreError> {
        let id = post.id.clone();
        self.posts.insert(id.clone(), post);
        Ok(id)
    }

    async fn attach_handle(
        &self,
        post_id: &str,
        platform: Platform,
        handle: SchedulerHandle,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .posts
            .get_mut(post_id)
            .ok_or_else(|| StoreError::Unavailable(format!("post vanished: {post_id}")))?;
        if let Some(target) = entry.targets.get_mut(&platform) {
            target.scheduler_handle = Some(handle);
        }
        Ok(())
    }

    async fn scheduled_for_owner(&self, owner_id: &str) -> Result<Vec<Post>, StoreError> {
        Ok(self
            .posts
            .iter()
            .filter(|entry| entry.owner_id == owner_id && entry.has_schedule())
            .map(|entry| entry.value().clone())
            .collect())
    }
}
