//! Recurring-queue scheduling engine for Evergreen.
//!
//! This crate implements the core of the recurring-publish system:
//! - Queue lifecycle management (create, update, pause, resume, delete)
//! - Exact and near scheduling-conflict detection
//! - Post cloning with per-platform publish scheduling
//! - The periodic due-queue batch processor

mod cloner;
mod config;
mod conflict;
mod error;
mod lifecycle;
mod processor;
mod service;

pub use cloner::PostCloner;
pub use config::{CadencePolicy, EngineConfig, DEFAULT_TICK_INTERVAL_SECS};
pub use conflict::{
    exact_conflict, near_conflicts, shares_lineage, EXACT_CONFLICT_TOLERANCE_MS,
    NEAR_CONFLICT_WINDOW_MS,
};
pub use error::{CloneError, QueueError};
pub use lifecycle::{CreateQueueRequest, QueueLifecycle, QueueUpdate};
pub use processor::{DueQueueProcessor, QueueFailure, RunSummary};
pub use service::{IdentityProvider, QueueService, StaticIdentity};
