//! Publish scheduler collaborator contract.
//!
//! The engine never publishes anything itself. It asks the scheduler
//! for a future invocation of the publisher and stores the returned
//! handle; how the platform HTTP call is made is the publisher's
//! business.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{Platform, SchedulerHandle, StoreError};

/// Type alias for the publish callback invoked when a clone comes due.
pub type PublishFn = Arc<
    dyn Fn(String, Platform) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send>>
        + Send
        + Sync,
>;

/// Collaborator contract for deferred publish scheduling.
#[async_trait]
pub trait PublishScheduler: Send + Sync {
    /// Request that the publisher be invoked at `at` for one platform
    /// copy of a post. Returns an opaque handle for the request.
    async fn schedule_at(
        &self,
        at: DateTime<Utc>,
        post_id: &str,
        platform: Platform,
    ) -> Result<SchedulerHandle, StoreError>;
}

/// Publish scheduler backed by spawned tokio tasks.
///
/// Each request spawns a task that sleeps until the target time and
/// then invokes the publish callback. Good enough for a single-process
/// daemon; a deployment with durability requirements would swap in a
/// store-backed implementation behind the same trait.
pub struct TokioPublishScheduler {
    publish: PublishFn,
}

impl TokioPublishScheduler {
    /// Create a scheduler invoking the given publish callback.
    pub fn new(publish: PublishFn) -> Self {
        Self { publish }
    }
}

#[async_trait]
impl PublishScheduler for TokioPublishScheduler {
    async fn schedule_at(
        &self,
        at: DateTime<Utc>,
        post_id: &str,
        platform: Platform,
    ) -> Result<SchedulerHandle, StoreError> {
        let handle = SchedulerHandle(Uuid::new_v4().to_string());
        let delay = (at - Utc::now()).to_std().unwrap_or_default();
        let publish = Arc::clone(&self.publish);
        let post_id = post_id.to_string();

        debug!(%post_id, %platform, %at, "scheduled publish");
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(error) = publish(post_id.clone(), platform).await {
                warn!(%post_id, %platform, %error, "publish failed");
            }
        });

        Ok(handle)
    }
}
