//! # Workspace Resolution
//!
//! Maps the requesting principal to the workspace (tenant) the backup
//! belongs to. The host application owns the real mapping; this crate
//! only consumes it through a trait seam and ships a fixed resolver
//! for single-workspace deployments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who asked for an operation. Carried into audit entries and
/// workspace resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
}

impl Principal {
    /// A human operator, by login name
    pub fn operator(name: impl Into<String>) -> Self {
        Self { id: name.into() }
    }

    /// The unattended scheduler
    pub fn system() -> Self {
        Self {
            id: "system".to_string(),
        }
    }
}

/// Errors from workspace resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no workspace for principal {principal}: {reason}")]
    NoWorkspace { principal: String, reason: String },
}

impl ResolveError {
    pub fn no_workspace(principal: &Principal, reason: impl Into<String>) -> Self {
        Self::NoWorkspace {
            principal: principal.id.clone(),
            reason: reason.into(),
        }
    }
}

/// Seam to the host application's tenant mapping
#[async_trait]
pub trait WorkspaceResolver: Send + Sync {
    async fn resolve_workspace_id(&self, principal: &Principal) -> Result<String, ResolveError>;
}

/// Resolver for deployments with exactly one workspace
pub struct FixedWorkspaceResolver {
    workspace_id: String,
}

impl FixedWorkspaceResolver {
    pub fn new(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
        }
    }
}

#[async_trait]
impl WorkspaceResolver for FixedWorkspaceResolver {
    async fn resolve_workspace_id(&self, _principal: &Principal) -> Result<String, ResolveError> {
        Ok(self.workspace_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_resolver_ignores_principal() {
        let resolver = FixedWorkspaceResolver::new("tenant-main");
        let a = resolver
            .resolve_workspace_id(&Principal::operator("alice"))
            .await
            .unwrap();
        let b = resolver
            .resolve_workspace_id(&Principal::system())
            .await
            .unwrap();
        assert_eq!(a, "tenant-main");
        assert_eq!(a, b);
    }

    #[test]
    fn test_principal_constructors() {
        assert_eq!(Principal::system().id, "system");
        assert_eq!(Principal::operator("ops").id, "ops");
    }
}
