//! Cron schedule for unattended backups.
//!
//! `BackupSchedule` only answers timing questions (`is_due`,
//! `next_run_at`); the actual firing happens in [`run`], a loop the
//! binary spawns alongside the HTTP server.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use croner::Cron;
use tracing::{info, warn};

use crate::backup::orchestrator::BackupOrchestrator;
use crate::config::{AppConfig, ConfigError};
use crate::errors::OrchestratorError;
use crate::workspace::Principal;

/// Parsed cron schedule for unattended backups.
///
/// Cheap to clone so the HTTP status endpoint can hold its own copy
/// for next-run computation.
#[derive(Clone, Debug)]
pub struct BackupSchedule {
    enabled: bool,
    pattern: String,
    cron: Option<Cron>,
}

impl BackupSchedule {
    /// Build a schedule from the application config.
    ///
    /// The pattern is only parsed when scheduling is enabled, so a
    /// disabled config with a stale pattern still loads.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let cron = if config.schedule_enabled {
            let parsed = Cron::new(&config.schedule_cron).parse().map_err(|e| {
                ConfigError::Invalid(format!(
                    "schedule_cron '{}' is not a valid cron pattern: {}",
                    config.schedule_cron, e
                ))
            })?;
            Some(parsed)
        } else {
            None
        };

        Ok(Self {
            enabled: config.schedule_enabled,
            pattern: config.schedule_cron.clone(),
            cron,
        })
    }

    /// Check whether unattended backups are enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The configured cron pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Next time the schedule fires, or None when disabled.
    pub fn next_run_at(&self) -> Option<DateTime<Utc>> {
        let cron = self.cron.as_ref()?;
        cron.find_next_occurrence(&Utc::now(), false).ok()
    }

    /// Check whether at least one occurrence has passed since `since`.
    pub fn is_due(&self, since: DateTime<Utc>) -> bool {
        let Some(cron) = &self.cron else {
            return false;
        };
        match cron.find_next_occurrence(&since, false) {
            Ok(next) => next <= Utc::now(),
            Err(_) => false,
        }
    }
}

/// Drive the schedule until the process shuts down.
///
/// Each occurrence fires one backup under the system principal. A
/// conflicting operation in flight skips the run with a log line; the
/// next occurrence is attempted normally.
pub async fn run(schedule: BackupSchedule, orchestrator: Arc<BackupOrchestrator>) {
    if !schedule.is_enabled() {
        info!("unattended backups disabled, scheduler not starting");
        return;
    }
    info!(pattern = %schedule.pattern(), "backup scheduler started");

    loop {
        let Some(next) = schedule.next_run_at() else {
            warn!(
                pattern = %schedule.pattern(),
                "schedule has no upcoming occurrence, scheduler stopping"
            );
            return;
        };

        let wait = (next - Utc::now()).to_std().unwrap_or(StdDuration::ZERO);
        tokio::time::sleep(wait).await;

        match orchestrator.execute_backup(&Principal::system()).await {
            Ok(record) => {
                info!(backup_id = %record.id, "scheduled backup completed");
            }
            Err(OrchestratorError::Conflict { operation }) => {
                info!(operation = %operation, "scheduled backup skipped, another operation is in flight");
            }
            Err(err) => {
                warn!(error = %err, "scheduled backup failed");
            }
        }
    }
}
