//! Record types and stores for the Evergreen recurring-queue engine.
//!
//! This crate provides:
//! - The persisted record shapes (queues, posts, platform targets)
//! - The in-memory queue store with per-record atomic updates
//! - Collaborator contracts for the post store and publish scheduler

mod error;
mod post_store;
mod publisher;
mod queue_store;
mod types;

pub use error::StoreError;
pub use post_store::{MemoryPostStore, PostStore};
pub use publisher::{PublishFn, PublishScheduler, TokioPublishScheduler};
pub use queue_store::{DueClaim, QueueStore};
pub use types::{Conflict, Platform, PlatformTarget, Post, Queue, QueueStatus, SchedulerHandle};
