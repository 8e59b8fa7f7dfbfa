//! # Orchestrator Errors
//!
//! Error taxonomy shared by the backup and restore orchestrators.
//!
//! Every failure class the orchestrators can surface is an explicit
//! variant, so the integration boundary (HTTP, CLI) can map each one to
//! a precise response code instead of pattern-matching on strings.

use serde::Serialize;
use std::fmt;

/// Orchestrator error types
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum OrchestratorError {
    /// Input rejected before any side effect (bad database name,
    /// path escaping the storage root)
    Validation {
        reason: String,
    },

    /// An operation of a conflicting kind is already in flight
    Conflict {
        operation: String,
    },

    /// No ledger record exists for the requested backup id
    NotFound {
        backup_id: String,
    },

    /// The ledger record exists but its artifact file is gone
    ArtifactMissing {
        backup_id: String,
        path: String,
    },

    /// Checksum mismatch, empty artifact, or failed health probe
    Integrity {
        message: String,
    },

    /// Workspace/tenant resolution failed
    Resolution {
        message: String,
    },

    /// External tool failed (non-zero exit, spawn failure, timeout)
    Subprocess {
        step: String,
        message: String,
    },

    /// Filesystem error outside the subprocess path
    Io {
        context: String,
        message: String,
    },

    /// Internal invariant violation
    Internal {
        message: String,
    },
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { reason } => {
                write!(f, "Validation failed: {}", reason)
            }
            Self::Conflict { operation } => {
                write!(f, "Conflicting operation already in progress: {}", operation)
            }
            Self::NotFound { backup_id } => {
                write!(f, "Backup not found: {}", backup_id)
            }
            Self::ArtifactMissing { backup_id, path } => {
                write!(f, "Backup file for {} is missing from disk: {}", backup_id, path)
            }
            Self::Integrity { message } => {
                write!(f, "Integrity check failed: {}", message)
            }
            Self::Resolution { message } => {
                write!(f, "Workspace resolution failed: {}", message)
            }
            Self::Subprocess { step, message } => {
                write!(f, "{} failed: {}", step, message)
            }
            Self::Io { context, message } => {
                write!(f, "{}: {}", context, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for OrchestratorError {}

/// Result type for orchestrator operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

impl OrchestratorError {
    /// Input validation failure
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into() }
    }

    /// Conflicting operation in flight
    pub fn conflict(operation: impl Into<String>) -> Self {
        Self::Conflict { operation: operation.into() }
    }

    /// Ledger record missing
    pub fn not_found(backup_id: impl Into<String>) -> Self {
        Self::NotFound { backup_id: backup_id.into() }
    }

    /// Artifact file missing
    pub fn artifact_missing(backup_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::ArtifactMissing {
            backup_id: backup_id.into(),
            path: path.into(),
        }
    }

    /// Integrity failure
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity { message: message.into() }
    }

    /// Workspace resolution failure
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution { message: message.into() }
    }

    /// External tool failure, tagged with the failing step
    pub fn subprocess(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Subprocess {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Filesystem failure with context
    pub fn io(context: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Conflict { .. } => 409,
            Self::NotFound { .. } => 404,
            Self::ArtifactMissing { .. } => 404,
            Self::Integrity { .. } => 422,
            Self::Resolution { .. } => 502,
            Self::Subprocess { .. } => 500,
            Self::Io { .. } => 500,
            Self::Internal { .. } => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_FAILED",
            Self::Conflict { .. } => "OPERATION_IN_FLIGHT",
            Self::NotFound { .. } => "BACKUP_NOT_FOUND",
            Self::ArtifactMissing { .. } => "ARTIFACT_MISSING",
            Self::Integrity { .. } => "INTEGRITY_CHECK_FAILED",
            Self::Resolution { .. } => "WORKSPACE_RESOLUTION_FAILED",
            Self::Subprocess { .. } => "TOOL_FAILED",
            Self::Io { .. } => "IO_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<crate::connection::ConnectionError> for OrchestratorError {
    fn from(err: crate::connection::ConnectionError) -> Self {
        Self::Validation {
            reason: err.to_string(),
        }
    }
}

impl From<crate::storage::ledger::LedgerError> for OrchestratorError {
    fn from(err: crate::storage::ledger::LedgerError) -> Self {
        Self::Io {
            context: "metadata ledger".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<crate::workspace::ResolveError> for OrchestratorError {
    fn from(err: crate::workspace::ResolveError) -> Self {
        Self::Resolution {
            message: err.to_string(),
        }
    }
}

impl From<crate::settings::SettingsError> for OrchestratorError {
    fn from(err: crate::settings::SettingsError) -> Self {
        Self::Internal {
            message: err.to_string(),
        }
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<OrchestratorError> for ErrorResponse {
    fn from(err: OrchestratorError) -> Self {
        Self {
            error: err.to_string(),
            code: err.error_code(),
            status: err.status_code(),
            details: serde_json::to_value(&err).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = OrchestratorError::conflict("backup");
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "OPERATION_IN_FLIGHT");

        let err = OrchestratorError::not_found("backup_123");
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "BACKUP_NOT_FOUND");
    }

    #[test]
    fn test_not_found_distinct_from_artifact_missing() {
        let record_missing = OrchestratorError::not_found("backup_1");
        let file_missing = OrchestratorError::artifact_missing("backup_1", "/backups/a.dump");

        assert_ne!(record_missing.error_code(), file_missing.error_code());
    }

    #[test]
    fn test_integrity_distinct_from_not_found() {
        let integrity = OrchestratorError::integrity("checksum mismatch");
        let missing = OrchestratorError::not_found("backup_1");

        assert_ne!(integrity.error_code(), missing.error_code());
        assert_eq!(integrity.status_code(), 422);
    }

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::subprocess("pg_dump", "exit status 1");
        assert!(err.to_string().contains("pg_dump"));
        assert!(err.to_string().contains("exit status 1"));
    }

    #[test]
    fn test_error_response_from() {
        let resp = ErrorResponse::from(OrchestratorError::validation("bad database name"));
        assert_eq!(resp.status, 400);
        assert_eq!(resp.code, "VALIDATION_FAILED");
        assert!(resp.error.contains("bad database name"));
    }
}
