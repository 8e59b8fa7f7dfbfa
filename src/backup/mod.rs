//! # Backup Module
//!
//! Backup orchestration for the managed database: record types, the
//! orchestrator that drives the external dump tool, retention cleanup,
//! and the cron scheduler hook.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod orchestrator;
pub mod retention;
pub mod scheduler;

pub use orchestrator::BackupOrchestrator;

/// Outcome of one backup run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupOutcome {
    Success,
    Failed,
}

impl BackupOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// One ledger entry describing a backup run.
///
/// Field names are camelCase on the wire to match the persisted
/// ledger format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub status: BackupOutcome,
    /// Artifact size in bytes; 0 for failed runs
    pub file_size: u64,
    /// Absolute artifact path; empty for failed runs
    pub file_path: String,
    /// Hex SHA-256 of the artifact; empty for failed runs
    pub checksum: String,
    pub tenant_id: String,
    pub database_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl BackupRecord {
    /// Record for a completed backup with a verified artifact
    pub fn success(
        id: String,
        tenant_id: String,
        database_name: String,
        file_path: String,
        file_size: u64,
        checksum: String,
    ) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            status: BackupOutcome::Success,
            file_size,
            file_path,
            checksum,
            tenant_id,
            database_name,
            error_message: None,
        }
    }

    /// Record for a failed attempt, carrying the step's diagnostic
    pub fn failure(id: String, tenant_id: String, database_name: String, error: String) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            status: BackupOutcome::Failed,
            file_size: 0,
            file_path: String::new(),
            checksum: String::new(),
            tenant_id,
            database_name,
            error_message: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BackupOutcome::Success
    }
}

/// Aggregate view over the ledger for the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatusSummary {
    /// Timestamp of the most recent successful backup
    pub last_backup: Option<DateTime<Utc>>,
    /// Next unattended run, when the scheduler is enabled
    pub next_scheduled: Option<DateTime<Utc>>,
    pub backup_count: usize,
    pub total_size_bytes: u64,
    /// Most recent record of any outcome
    pub last_record: Option<BackupRecord>,
}

/// Summarize ledger records, newest last as stored
pub fn summarize(records: &[BackupRecord], next_scheduled: Option<DateTime<Utc>>) -> BackupStatusSummary {
    let last_backup = records
        .iter()
        .rev()
        .find(|r| r.is_success())
        .map(|r| r.timestamp);
    let total_size_bytes = records
        .iter()
        .filter(|r| r.is_success())
        .map(|r| r.file_size)
        .sum();

    BackupStatusSummary {
        last_backup,
        next_scheduled,
        backup_count: records.len(),
        total_size_bytes,
        last_record: records.last().cloned(),
    }
}

/// New time-based backup id, unique even under rapid successive runs
pub fn new_backup_id() -> String {
    format!("backup_{}_{}", Utc::now().timestamp_millis(), short_token())
}

/// Six hex characters of fresh randomness
pub(crate) fn short_token() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..6].to_string()
}
