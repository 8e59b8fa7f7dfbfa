//! # Retention Cleanup
//!
//! Drops ledger records older than the retention window and deletes
//! their artifact files. Deletion is best-effort: a file already gone
//! is not an error, and a record whose path no longer resolves inside
//! the storage root is dropped without touching the file. Running
//! twice in a row is a no-op the second time.

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::OrchestratorResult;
use crate::settings::SettingsStore;
use crate::storage::{MetadataLedger, StorageLayout};

/// What one cleanup pass did
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    /// Artifact files actually removed
    pub deleted_count: usize,
    /// Records kept in the ledger
    pub retained_count: usize,
    /// Expired records whose artifact was already gone
    pub missing_count: usize,
}

/// Remove backups older than the retention window.
///
/// The window comes from the settings store at call time, so a PATCH
/// to `retention_days` applies to the very next pass.
pub async fn run_cleanup(
    ledger: &MetadataLedger,
    layout: &StorageLayout,
    settings: &dyn SettingsStore,
) -> OrchestratorResult<CleanupReport> {
    let retention_days = settings.get_settings().await?.retention_days;
    let cutoff = Utc::now() - Duration::days(i64::from(retention_days));

    let records = ledger.load_all().await?;
    let (retained, expired): (Vec<_>, Vec<_>) =
        records.into_iter().partition(|r| r.timestamp >= cutoff);

    let mut deleted_count = 0;
    let mut missing_count = 0;
    for record in &expired {
        if record.file_path.is_empty() {
            continue;
        }
        let path = std::path::Path::new(&record.file_path);
        if !layout.contains(path) {
            warn!(
                backup_id = %record.id,
                path = %record.file_path,
                "expired record points outside the storage root, leaving file alone"
            );
            continue;
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(backup_id = %record.id, path = %record.file_path, "deleted expired artifact");
                deleted_count += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                missing_count += 1;
            }
            Err(e) => {
                warn!(backup_id = %record.id, error = %e, "could not delete expired artifact");
            }
        }
    }

    let retained_count = retained.len();
    if !expired.is_empty() {
        ledger.replace_all(retained).await?;
    }

    Ok(CleanupReport {
        deleted_count,
        retained_count,
        missing_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupRecord;
    use crate::settings::{InMemorySettingsStore, OperationalSettings, SettingsPatch, SettingsStore};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        layout: StorageLayout,
        ledger: MetadataLedger,
        settings: Arc<InMemorySettingsStore>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.ensure_directories().unwrap();
        let ledger = MetadataLedger::new(layout.ledger_path(), 100);
        let settings = Arc::new(InMemorySettingsStore::new(OperationalSettings::default()));
        Fixture {
            _dir: dir,
            layout,
            ledger,
            settings,
        }
    }

    fn record_aged(f: &Fixture, id: &str, days_old: i64, with_file: bool) -> BackupRecord {
        let path = f.layout.root().join(format!("{}.dump", id));
        if with_file {
            std::fs::write(&path, b"dump bytes").unwrap();
        }
        let mut record = BackupRecord::success(
            id.to_string(),
            "tenant-1".to_string(),
            "crm".to_string(),
            path.to_string_lossy().to_string(),
            10,
            "digest".to_string(),
        );
        record.timestamp = Utc::now() - Duration::days(days_old);
        record
    }

    #[tokio::test]
    async fn test_expired_artifacts_deleted_and_records_dropped() {
        let f = fixture();
        let old = record_aged(&f, "backup_old_aaaaaa", 45, true);
        let fresh = record_aged(&f, "backup_new_bbbbbb", 2, true);
        let old_path = old.file_path.clone();
        let fresh_path = fresh.file_path.clone();
        f.ledger.append(old).await.unwrap();
        f.ledger.append(fresh).await.unwrap();

        let report = run_cleanup(&f.ledger, &f.layout, f.settings.as_ref())
            .await
            .unwrap();

        assert_eq!(report.deleted_count, 1);
        assert_eq!(report.retained_count, 1);
        assert!(!std::path::Path::new(&old_path).exists());
        assert!(std::path::Path::new(&fresh_path).exists());

        let remaining = f.ledger.load_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "backup_new_bbbbbb");
    }

    #[tokio::test]
    async fn test_missing_artifact_is_not_an_error() {
        let f = fixture();
        let old = record_aged(&f, "backup_old_aaaaaa", 45, false);
        f.ledger.append(old).await.unwrap();

        let report = run_cleanup(&f.ledger, &f.layout, f.settings.as_ref())
            .await
            .unwrap();

        assert_eq!(report.deleted_count, 0);
        assert_eq!(report.missing_count, 1);
        assert!(f.ledger.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_records_expire_without_file_operations() {
        let f = fixture();
        let mut failed = BackupRecord::failure(
            "backup_failed_cccccc".to_string(),
            "tenant-1".to_string(),
            "crm".to_string(),
            "boom".to_string(),
        );
        failed.timestamp = Utc::now() - Duration::days(60);
        f.ledger.append(failed).await.unwrap();

        let report = run_cleanup(&f.ledger, &f.layout, f.settings.as_ref())
            .await
            .unwrap();

        assert_eq!(report.deleted_count, 0);
        assert_eq!(report.missing_count, 0);
        assert!(f.ledger.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_path_outside_root_is_never_deleted() {
        let f = fixture();
        let outside_dir = TempDir::new().unwrap();
        let outside_path = outside_dir.path().join("stolen.dump");
        std::fs::write(&outside_path, b"do not touch").unwrap();

        let mut sneaky = BackupRecord::success(
            "backup_sneaky_dddddd".to_string(),
            "tenant-1".to_string(),
            "crm".to_string(),
            outside_path.to_string_lossy().to_string(),
            12,
            "digest".to_string(),
        );
        sneaky.timestamp = Utc::now() - Duration::days(60);
        f.ledger.append(sneaky).await.unwrap();

        let report = run_cleanup(&f.ledger, &f.layout, f.settings.as_ref())
            .await
            .unwrap();

        assert_eq!(report.deleted_count, 0);
        assert!(outside_path.exists());
        // The record is still dropped from the ledger.
        assert!(f.ledger.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let f = fixture();
        f.ledger
            .append(record_aged(&f, "backup_old_aaaaaa", 45, true))
            .await
            .unwrap();

        let first = run_cleanup(&f.ledger, &f.layout, f.settings.as_ref())
            .await
            .unwrap();
        assert_eq!(first.deleted_count, 1);

        let second = run_cleanup(&f.ledger, &f.layout, f.settings.as_ref())
            .await
            .unwrap();
        assert_eq!(second.deleted_count, 0);
        assert_eq!(second.retained_count, 0);
        assert_eq!(second.missing_count, 0);
    }

    #[tokio::test]
    async fn test_window_follows_settings_changes() {
        let f = fixture();
        f.ledger
            .append(record_aged(&f, "backup_mid_eeeeee", 10, true))
            .await
            .unwrap();

        // 30-day default keeps a 10-day-old backup.
        let report = run_cleanup(&f.ledger, &f.layout, f.settings.as_ref())
            .await
            .unwrap();
        assert_eq!(report.retained_count, 1);

        // Tightening the window to 7 days expires it.
        f.settings
            .update_settings(SettingsPatch {
                retention_days: Some(7),
                ..Default::default()
            })
            .await
            .unwrap();

        let report = run_cleanup(&f.ledger, &f.layout, f.settings.as_ref())
            .await
            .unwrap();
        assert_eq!(report.retained_count, 0);
        assert_eq!(report.deleted_count, 1);
    }
}
