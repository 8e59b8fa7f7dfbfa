//! # Single-Flight Control
//!
//! At most one backup and at most one restore may run at a time, and
//! the two kinds exclude each other. Requests that lose the race are
//! rejected immediately rather than queued, so a caller always learns
//! right away that an operation is already in flight.
//!
//! Permits are RAII guards. Dropping the permit, on success, failure,
//! or panic unwind, reopens the gate.

use crate::errors::{OrchestratorError, OrchestratorResult};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A named one-permit gate
#[derive(Clone)]
pub struct SingleFlight {
    name: &'static str,
    semaphore: Arc<Semaphore>,
}

/// Held while an operation is in flight. Dropping it ends the flight.
#[derive(Debug)]
pub struct FlightPermit {
    _permit: OwnedSemaphorePermit,
}

impl SingleFlight {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Claim the gate without waiting. `None` means it is held.
    pub fn try_acquire(&self) -> Option<FlightPermit> {
        self.semaphore
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| FlightPermit { _permit: permit })
    }

    /// Whether the gate is currently held
    pub fn is_busy(&self) -> bool {
        self.semaphore.available_permits() == 0
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The two gates plus the cross-exclusion policy between them
#[derive(Clone)]
pub struct FlightControl {
    backup: SingleFlight,
    restore: SingleFlight,
}

impl FlightControl {
    pub fn new() -> Self {
        Self {
            backup: SingleFlight::new("backup"),
            restore: SingleFlight::new("restore"),
        }
    }

    /// Whether a backup currently holds its gate
    pub fn backup_in_progress(&self) -> bool {
        self.backup.is_busy()
    }

    /// Whether a restore currently holds its gate
    pub fn restore_in_progress(&self) -> bool {
        self.restore.is_busy()
    }

    /// Claim the backup gate.
    ///
    /// The own-kind permit is taken first and released again if the
    /// other kind turns out to be busy, so two racing opposite-kind
    /// requests can both lose but can never both win.
    pub fn begin_backup(&self) -> OrchestratorResult<FlightPermit> {
        let permit = self
            .backup
            .try_acquire()
            .ok_or_else(|| OrchestratorError::conflict(self.backup.name()))?;

        if self.restore.is_busy() {
            drop(permit);
            return Err(OrchestratorError::conflict(self.restore.name()));
        }

        Ok(permit)
    }

    /// Claim the restore gate
    pub fn begin_restore(&self) -> OrchestratorResult<FlightPermit> {
        let permit = self
            .restore
            .try_acquire()
            .ok_or_else(|| OrchestratorError::conflict(self.restore.name()))?;

        if self.backup.is_busy() {
            drop(permit);
            return Err(OrchestratorError::conflict(self.backup.name()));
        }

        Ok(permit)
    }

    /// Claim the backup gate from inside a running restore.
    ///
    /// The safety snapshot taken before a destructive restore runs
    /// while the restore gate is already held, so this skips the
    /// restore-busy check and enforces only backup single-flight.
    pub(crate) fn begin_snapshot(&self) -> OrchestratorResult<FlightPermit> {
        self.backup
            .try_acquire()
            .ok_or_else(|| OrchestratorError::conflict(self.backup.name()))
    }
}

impl Default for FlightControl {
    fn default() -> Self {
        Self::new()
    }
}
