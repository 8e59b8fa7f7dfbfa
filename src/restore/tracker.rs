//! In-memory restore status tracking.
//!
//! Many polling readers, one writer (the active restore task). Entries
//! are never persisted; terminal entries are swept after a grace
//! period so the map cannot grow without bound. The sweep runs from a
//! background interval task and opportunistically when a restore
//! starts.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tracing::debug;

use crate::restore::RestoreStatus;

/// Shared map from restore id to its current status.
///
/// Cloning shares the underlying map.
#[derive(Clone)]
pub struct RestoreTracker {
    inner: Arc<RwLock<HashMap<String, RestoreStatus>>>,
    grace: Duration,
}

impl RestoreTracker {
    /// Tracker that keeps terminal entries for `grace` after completion
    pub fn new(grace: StdDuration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            grace: Duration::from_std(grace).unwrap_or_else(|_| Duration::hours(1)),
        }
    }

    /// Register a fresh running status and return a copy of it.
    ///
    /// Also sweeps expired entries so long-idle processes clean up
    /// without waiting for the background task.
    pub fn start(&self, restore_id: &str) -> RestoreStatus {
        self.sweep_expired();
        let status = RestoreStatus::started(restore_id.to_string());
        self.inner
            .write()
            .expect("restore status lock poisoned")
            .insert(restore_id.to_string(), status.clone());
        status
    }

    /// Advance progress and replace the step message.
    ///
    /// Progress is monotonic; values below the current one keep the
    /// current one. Progress 100 is reserved for the completed
    /// transition, so running updates cap at 99. Terminal entries and
    /// unknown ids absorb the call.
    pub fn update(&self, restore_id: &str, progress: u8, message: &str) {
        let mut map = self.inner.write().expect("restore status lock poisoned");
        if let Some(status) = map.get_mut(restore_id) {
            if status.is_terminal() {
                return;
            }
            status.progress = status.progress.max(progress.min(99));
            status.message = message.to_string();
        }
    }

    /// Transition to completed at progress 100.
    ///
    /// Terminal entries absorb the call.
    pub fn complete(&self, restore_id: &str, message: &str) {
        let mut map = self.inner.write().expect("restore status lock poisoned");
        if let Some(status) = map.get_mut(restore_id) {
            if status.is_terminal() {
                return;
            }
            status.state = crate::restore::RestoreState::Completed;
            status.progress = 100;
            status.message = message.to_string();
            status.completed_at = Some(Utc::now());
        }
    }

    /// Transition to failed, freezing progress at its last value.
    ///
    /// Terminal entries absorb the call.
    pub fn fail(&self, restore_id: &str, error: &str) {
        let mut map = self.inner.write().expect("restore status lock poisoned");
        if let Some(status) = map.get_mut(restore_id) {
            if status.is_terminal() {
                return;
            }
            status.state = crate::restore::RestoreState::Failed;
            status.message = error.to_string();
            status.error_message = Some(error.to_string());
            status.completed_at = Some(Utc::now());
        }
    }

    /// Current status for an id, if the tracker still knows it
    pub fn status(&self, restore_id: &str) -> Option<RestoreStatus> {
        self.inner
            .read()
            .expect("restore status lock poisoned")
            .get(restore_id)
            .cloned()
    }

    /// Number of tracked entries, terminal included
    pub fn count(&self) -> usize {
        self.inner
            .read()
            .expect("restore status lock poisoned")
            .len()
    }

    /// Remove terminal entries past the grace period.
    ///
    /// Running entries are never swept. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let cutoff = Utc::now() - self.grace;
        let mut map = self.inner.write().expect("restore status lock poisoned");
        let before = map.len();
        map.retain(|_, status| {
            !(status.is_terminal() && status.completed_at.is_some_and(|at| at < cutoff))
        });
        before - map.len()
    }
}

/// Periodic sweep loop, spawned alongside the HTTP server
pub async fn run_sweeper(tracker: RestoreTracker, every: StdDuration) {
    let mut ticker = tokio::time::interval(every);
    // First tick fires immediately; skip it so a fresh process does
    // not sweep before anything can exist.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let removed = tracker.sweep_expired();
        if removed > 0 {
            debug!(removed, "swept expired restore statuses");
        }
    }
}
