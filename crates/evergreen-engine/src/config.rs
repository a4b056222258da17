//! Engine configuration.
//!
//! Behavior knobs are collected here and injected explicitly, never
//! read from ambient process-wide state.

use std::time::Duration;

/// Default processor tick interval in seconds (5 minutes). A short
/// interval keeps due-time drift small.
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 300;

/// How the next due time is anchored after a successful execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CadencePolicy {
    /// Anchor to the actual processing time. The observed production
    /// behavior: the calendar cadence drifts when a run is late.
    #[default]
    DriftTolerant,
    /// Anchor to the previous due time, keeping a fixed calendar
    /// cadence regardless of processing delay.
    Fixed,
}

/// Configuration injected into the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rescheduling policy after a successful execution.
    pub cadence: CadencePolicy,
    /// How often the due-queue processor runs.
    pub tick_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cadence: CadencePolicy::default(),
            tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
        }
    }
}
