//! # Storage Layout
//!
//! Paths under the backup root. Artifacts sit directly under the root;
//! the ledger lives in a `metadata/` subdirectory. Every artifact path
//! handed to a subprocess or deleted by cleanup must resolve inside
//! the root. Paths read back from the ledger are re-checked before
//! use, in case the ledger file was edited by hand.

use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};

const METADATA_DIR: &str = "metadata";
const LEDGER_FILE: &str = "backups.json";
const ARTIFACT_EXTENSION: &str = "dump";

/// Resolves and guards paths under one backup root
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root and metadata directories if absent
    pub fn ensure_directories(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.metadata_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    /// Path of the persisted ledger file
    pub fn ledger_path(&self) -> PathBuf {
        self.metadata_dir().join(LEDGER_FILE)
    }

    /// Build an artifact file name:
    /// `<db>_<tenant>_<YYYYmmdd_HHMMSS>_<token>.dump`.
    ///
    /// The tenant component comes from an external resolver, so it is
    /// sanitized before it can shape a path.
    pub fn artifact_file_name(
        database: &str,
        tenant: &str,
        timestamp: DateTime<Utc>,
        token: &str,
    ) -> String {
        format!(
            "{}_{}_{}_{}.{}",
            database,
            sanitize_component(tenant),
            timestamp.format("%Y%m%d_%H%M%S"),
            token,
            ARTIFACT_EXTENSION
        )
    }

    /// Resolve a bare file name to an absolute path under the root.
    ///
    /// Rejects names with separators or parent components, so a name
    /// can never address anything outside the root.
    pub fn artifact_path(&self, file_name: &str) -> io::Result<PathBuf> {
        if file_name.is_empty()
            || file_name.contains('/')
            || file_name.contains('\\')
            || file_name.contains("..")
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("artifact name '{}' escapes the storage root", file_name),
            ));
        }
        Ok(self.root.join(file_name))
    }

    /// Whether an artifact path from the ledger still resolves inside
    /// the root. Resolution uses the canonicalized parent, so symlink
    /// tricks do not pass.
    pub fn contains(&self, path: &Path) -> bool {
        let Ok(root) = self.root.canonicalize() else {
            return false;
        };
        let Some(parent) = path.parent() else {
            return false;
        };
        let Ok(parent) = parent.canonicalize() else {
            return false;
        };
        parent.starts_with(&root)
    }
}

/// Keep letters, digits, underscore, and hyphen; replace the rest.
/// Empty input becomes "unknown".
fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}
