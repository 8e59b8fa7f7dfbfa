//! # Metadata Ledger
//!
//! Persisted JSON array of backup records at
//! `<root>/metadata/backups.json`, capped to the most recent N
//! entries. Every mutation rewrites the whole file through a temp
//! file, fsync, and rename, so readers only ever see a complete
//! ledger.
//!
//! The ledger assumes a single orchestrator process owns the file.
//! Mutations within that process are serialized by an internal lock;
//! there is no cross-process locking.

use crate::backup::BackupRecord;
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Errors from ledger persistence
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger at {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize ledger: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Capped, persisted history of backup runs
pub struct MetadataLedger {
    path: PathBuf,
    cap: usize,
    write_lock: Mutex<()>,
}

impl MetadataLedger {
    /// `cap` bounds how many records survive an append; the oldest
    /// are evicted first.
    pub fn new(path: PathBuf, cap: usize) -> Self {
        Self {
            path,
            cap,
            write_lock: Mutex::new(()),
        }
    }

    /// All records in insertion order. A missing file is an empty
    /// ledger (cold start); unparsable content is an error, never
    /// silently discarded history.
    pub async fn load_all(&self) -> Result<Vec<BackupRecord>, LedgerError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(LedgerError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| LedgerError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Look up one record by backup id
    pub async fn find(&self, id: &str) -> Result<Option<BackupRecord>, LedgerError> {
        Ok(self.load_all().await?.into_iter().find(|r| r.id == id))
    }

    /// Append a record, evicting the oldest past the cap
    pub async fn append(&self, record: BackupRecord) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load_all().await?;
        records.push(record);
        if records.len() > self.cap {
            let excess = records.len() - self.cap;
            records.drain(..excess);
        }
        self.write_atomic(&records).await
    }

    /// Replace the entire ledger, used by retention cleanup
    pub async fn replace_all(&self, records: Vec<BackupRecord>) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().await;
        self.write_atomic(&records).await
    }

    async fn write_atomic(&self, records: &[BackupRecord]) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(records).map_err(LedgerError::Serialize)?;

        let tmp = self.path.with_extension("json.tmp");
        let wrap_io = |source| LedgerError::Io {
            path: self.path.clone(),
            source,
        };

        let mut file = tokio::fs::File::create(&tmp).await.map_err(wrap_io)?;
        file.write_all(json.as_bytes()).await.map_err(wrap_io)?;
        file.sync_all().await.map_err(wrap_io)?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await.map_err(wrap_io)?;

        // fsync the directory so the rename is durable
        if let Some(dir) = self.path.parent() {
            if let Ok(handle) = std::fs::File::open(dir) {
                let _ = handle.sync_all();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupRecord;
    use tempfile::TempDir;

    fn record(id: &str) -> BackupRecord {
        BackupRecord::success(
            id.to_string(),
            "tenant-1".to_string(),
            "crm".to_string(),
            format!("/backups/{}.dump", id),
            100,
            "checksum".to_string(),
        )
    }

    fn ledger_in(dir: &TempDir, cap: usize) -> MetadataLedger {
        MetadataLedger::new(dir.path().join("backups.json"), cap)
    }

    #[tokio::test]
    async fn test_cold_start_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir, 100);
        assert!(ledger.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_persists_in_order() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir, 100);

        ledger.append(record("backup_1_aaaaaa")).await.unwrap();
        ledger.append(record("backup_2_bbbbbb")).await.unwrap();

        let records = ledger.load_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "backup_1_aaaaaa");
        assert_eq!(records[1].id, "backup_2_bbbbbb");
    }

    #[tokio::test]
    async fn test_cap_evicts_oldest() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir, 3);

        for i in 0..5 {
            ledger.append(record(&format!("backup_{}_t", i))).await.unwrap();
        }

        let records = ledger.load_all().await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, "backup_2_t");
        assert_eq!(records[2].id, "backup_4_t");
    }

    #[tokio::test]
    async fn test_find() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir, 100);
        ledger.append(record("backup_7_ffffff")).await.unwrap();

        assert!(ledger.find("backup_7_ffffff").await.unwrap().is_some());
        assert!(ledger.find("backup_missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_all() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir, 100);
        for i in 0..4 {
            ledger.append(record(&format!("backup_{}_t", i))).await.unwrap();
        }

        ledger
            .replace_all(vec![record("backup_2_t"), record("backup_3_t")])
            .await
            .unwrap();

        let records = ledger.load_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "backup_2_t");
    }

    #[tokio::test]
    async fn test_corrupt_ledger_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backups.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let ledger = MetadataLedger::new(path, 100);
        assert!(matches!(
            ledger.load_all().await.unwrap_err(),
            LedgerError::Corrupt { .. }
        ));
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir, 100);
        ledger.append(record("backup_1_aaaaaa")).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["backups.json".to_string()]);
    }

    #[tokio::test]
    async fn test_round_trips_wire_format() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir, 100);
        ledger.append(record("backup_9_abcdef")).await.unwrap();

        // The persisted file is a JSON array with camelCase fields.
        let raw = std::fs::read_to_string(dir.path().join("backups.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["databaseName"], "crm");
        assert_eq!(value[0]["fileSize"], 100);
    }
}
