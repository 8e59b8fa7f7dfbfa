//! # Audit Trail
//!
//! Append-only record of who triggered which backup or restore and
//! what came of it. Recording is fire-and-forget; a full or failing
//! sink never blocks an operation.
//!
//! The in-memory sink is a bounded FIFO. A deployment that needs
//! durable audit history plugs its own sink into the trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    BackupCreated,
    BackupFailed,
    RestoreStarted,
    RestoreCompleted,
    RestoreFailed,
    CleanupRun,
    SettingsChanged,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::BackupCreated => "backup_created",
            AuditAction::BackupFailed => "backup_failed",
            AuditAction::RestoreStarted => "restore_started",
            AuditAction::RestoreCompleted => "restore_completed",
            AuditAction::RestoreFailed => "restore_failed",
            AuditAction::CleanupRun => "cleanup_run",
            AuditAction::SettingsChanged => "settings_changed",
        }
    }
}

/// One audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    /// Principal id that triggered the operation
    pub actor: String,
    pub backup_id: Option<String>,
    pub restore_id: Option<String>,
    /// Safety snapshot taken before a destructive restore
    pub snapshot_path: Option<String>,
    pub detail: Option<String>,
}

impl AuditEntry {
    pub fn builder(action: AuditAction, actor: impl Into<String>) -> AuditEntryBuilder {
        AuditEntryBuilder {
            action,
            actor: actor.into(),
            backup_id: None,
            restore_id: None,
            snapshot_path: None,
            detail: None,
        }
    }
}

/// Builder for audit entries
pub struct AuditEntryBuilder {
    action: AuditAction,
    actor: String,
    backup_id: Option<String>,
    restore_id: Option<String>,
    snapshot_path: Option<String>,
    detail: Option<String>,
}

impl AuditEntryBuilder {
    pub fn backup_id(mut self, id: impl Into<String>) -> Self {
        self.backup_id = Some(id.into());
        self
    }

    pub fn restore_id(mut self, id: impl Into<String>) -> Self {
        self.restore_id = Some(id.into());
        self
    }

    pub fn snapshot_path(mut self, path: impl Into<String>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn build(self) -> AuditEntry {
        AuditEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action: self.action,
            actor: self.actor,
            backup_id: self.backup_id,
            restore_id: self.restore_id,
            snapshot_path: self.snapshot_path,
            detail: self.detail,
        }
    }
}

/// Fire-and-forget audit seam
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry);
}

/// Bounded in-memory audit log, FIFO eviction
#[derive(Debug)]
pub struct MemoryAuditLog {
    max_entries: usize,
    entries: RwLock<VecDeque<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            entries: RwLock::new(VecDeque::new()),
        }
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .read()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}

impl Default for MemoryAuditLog {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn record(&self, entry: AuditEntry) {
        if let Ok(mut entries) = self.entries.write() {
            while entries.len() >= self.max_entries {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
    }
}

/// Thread-safe audit log handle
pub type SharedAuditLog = Arc<MemoryAuditLog>;
