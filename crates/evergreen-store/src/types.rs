//! Record types for queues, posts, and computed conflicts.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recurring-publish intent tied to one source post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    /// Record id.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// The post this queue re-publishes. Referenced, not owned; never
    /// changes after creation.
    pub source_post_id: String,
    /// Single authoritative lifecycle field.
    pub status: QueueStatus,
    /// Days between executions, at least 1.
    pub interval_days: u32,
    /// When this queue should next execute.
    pub next_due_time: DateTime<Utc>,
    /// When this queue last executed successfully.
    pub last_executed_time: Option<DateTime<Utc>>,
    /// Number of successful executions so far.
    pub execution_count: u32,
    /// When set, bounds total executions.
    pub max_executions: Option<u32>,
    /// When this queue was created.
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of a queue. `Completed` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// Queue executes when its due time passes.
    #[default]
    Active,
    /// Queue is suspended; resuming restarts the interval.
    Paused,
    /// Queue reached its execution bound or lost its source post.
    Completed,
}

impl Queue {
    /// Create a new active queue.
    pub fn new(
        id: String,
        owner_id: String,
        source_post_id: String,
        interval_days: u32,
        next_due_time: DateTime<Utc>,
        max_executions: Option<u32>,
    ) -> Self {
        Self {
            id,
            owner_id,
            source_post_id,
            status: QueueStatus::Active,
            interval_days,
            next_due_time,
            last_executed_time: None,
            execution_count: 0,
            max_executions,
            created_at: Utc::now(),
        }
    }

    /// The repeat interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::days(i64::from(self.interval_days))
    }

    /// Check if this queue is due to execute at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == QueueStatus::Active && self.next_due_time <= now
    }

    /// Check if the execution bound has been reached.
    pub fn reached_max(&self) -> bool {
        self.max_executions
            .is_some_and(|max| self.execution_count >= max)
    }
}

/// A publishing platform a post can target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Twitter,
    Linkedin,
    Facebook,
    Instagram,
}

impl Platform {
    /// Stable lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-platform content and publish state on a post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformTarget {
    /// Platform-specific content. A platform is targeted iff this is
    /// non-empty after trimming.
    pub content: String,
    /// When this platform's copy should publish.
    pub scheduled_time: Option<DateTime<Utc>>,
    /// Platform-assigned id, populated by the publisher after the fact.
    pub platform_post_id: Option<String>,
    /// Handle for the deferred publish invocation.
    pub scheduler_handle: Option<SchedulerHandle>,
}

impl PlatformTarget {
    /// A target with content only, not yet scheduled.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Whether this target carries publishable content.
    pub fn is_enabled(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// A post record, owned by the post store. Queues only reference posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Record id.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Per-platform content and publish state.
    pub targets: BTreeMap<Platform, PlatformTarget>,
    /// Set only on queue-generated clones.
    pub created_by_queue_id: Option<String>,
    /// Set only on clones; points at the direct source post.
    pub cloned_from_post_id: Option<String>,
    /// When this post was created.
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Create a post with the given platform contents and a fresh id.
    pub fn new(owner_id: impl Into<String>, targets: BTreeMap<Platform, PlatformTarget>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            targets,
            created_by_queue_id: None,
            cloned_from_post_id: None,
            created_at: Utc::now(),
        }
    }

    /// Platforms with non-empty content after trimming.
    pub fn enabled_platforms(&self) -> Vec<Platform> {
        self.targets
            .iter()
            .filter(|(_, target)| target.is_enabled())
            .map(|(platform, _)| *platform)
            .collect()
    }

    /// The scheduled publish time for one platform, if any.
    pub fn scheduled_time(&self, platform: Platform) -> Option<DateTime<Utc>> {
        self.targets
            .get(&platform)
            .and_then(|target| target.scheduled_time)
    }

    /// Whether any platform has a scheduled publish time.
    pub fn has_schedule(&self) -> bool {
        self.targets
            .values()
            .any(|target| target.scheduled_time.is_some())
    }
}

/// Opaque reference to a deferred publish invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchedulerHandle(pub String);

impl fmt::Display for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scheduling collision between a queue and an already-scheduled post.
///
/// Computed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub queue_id: String,
    pub post_id: String,
    pub queue_time: DateTime<Utc>,
    pub post_time: DateTime<Utc>,
    pub platform: Platform,
}
