//! CLI error type. Everything here surfaces as a message on stderr and
//! a non-zero exit.

use thiserror::Error;

use crate::config::ConfigError;
use crate::errors::OrchestratorError;
use crate::storage::LedgerError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The operator declined, or a check refused to proceed
    #[error("{0}")]
    Aborted(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted(reason.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
