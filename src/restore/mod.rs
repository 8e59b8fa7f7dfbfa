//! # Restore Module
//!
//! Restore orchestration: status types, the in-memory tracker polled by
//! callers, and the orchestrator that verifies an artifact, snapshots
//! the live database, and drives the external restore tool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod orchestrator;
pub mod tracker;

pub use orchestrator::RestoreOrchestrator;
pub use tracker::RestoreTracker;

/// Lifecycle state of one restore run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreState {
    Running,
    Completed,
    Failed,
}

impl RestoreState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Terminal states absorb further mutation attempts
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Point-in-time view of a restore, polled through the tracker.
///
/// Never persisted; lives only for the life of the process and is
/// swept from the tracker a grace period after reaching a terminal
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreStatus {
    pub restore_id: String,
    pub state: RestoreState,
    /// Non-decreasing in [0,100]; 100 only when completed, frozen at
    /// the last value on failure
    pub progress: u8,
    /// Human-readable current step
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RestoreStatus {
    /// Fresh running status at progress zero
    pub fn started(restore_id: String) -> Self {
        Self {
            restore_id,
            state: RestoreState::Running,
            progress: 0,
            message: "restore started".to_string(),
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
        }
    }

    /// Placeholder returned for ids the tracker no longer knows.
    ///
    /// Unknown and expired ids are indistinguishable to callers, so
    /// both surface as a failed status rather than an HTTP error.
    pub fn unknown(restore_id: String) -> Self {
        let now = Utc::now();
        Self {
            restore_id,
            state: RestoreState::Failed,
            progress: 0,
            message: "restore not found or expired".to_string(),
            started_at: now,
            completed_at: Some(now),
            error_message: Some("restore not found or expired".to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// New time-based restore id, unique even under rapid successive runs
pub fn new_restore_id() -> String {
    format!(
        "restore_{}_{}",
        Utc::now().timestamp_millis(),
        crate::backup::short_token()
    )
}
