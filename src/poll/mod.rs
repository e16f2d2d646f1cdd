//! Polling - analysis-lifecycle tracking for submitted runs

mod coordinator;

pub use coordinator::{OnComplete, PollCoordinator};

use std::time::Duration;

/// Default delay between status checks
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Default attempt ceiling (120 checks at 5 s = 10 minutes wall clock)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 120;

/// Timing knobs for a polling loop
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Delay between consecutive status checks
    pub interval: Duration,

    /// Hard ceiling on status checks before the loop gives up
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Terminal result of one session's polling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The run finished; results are ready
    Complete,
    /// A status request failed; polling stopped at that attempt
    Failed(String),
    /// The attempt ceiling was reached without completion
    TimedOut,
    /// The loop was cancelled before reaching a terminal state
    Cancelled,
}

/// Notification emitted when a polling loop stops
///
/// Drives user-facing notifications the way the dashboard surfaced toasts.
#[derive(Debug, Clone)]
pub struct PollEvent {
    pub session_id: String,
    pub outcome: PollOutcome,
}
