//! # Settings Routes
//!
//! Read and patch operational settings at runtime. Changes take effect
//! immediately; retention cleanup and the notifier re-read settings on
//! every use.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::audit::{AuditAction, AuditEntry, AuditSink};
use crate::errors::OrchestratorError;
use crate::http_server::{error_response, principal_from};
use crate::settings::{SettingsError, SettingsPatch, SettingsStore};

/// Settings endpoint state
#[derive(Clone)]
pub struct SettingsApiState {
    store: Arc<dyn SettingsStore>,
    audit: Arc<dyn AuditSink>,
}

impl SettingsApiState {
    pub fn new(store: Arc<dyn SettingsStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }
}

/// Build settings routes
pub fn settings_routes(state: Arc<SettingsApiState>) -> Router {
    Router::new()
        .route("/v1/settings", get(get_settings).patch(patch_settings))
        .with_state(state)
}

/// GET /v1/settings - current operational settings
async fn get_settings(State(state): State<Arc<SettingsApiState>>) -> impl IntoResponse {
    match state.store.get_settings().await {
        Ok(settings) => (StatusCode::OK, Json(settings)).into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// PATCH /v1/settings - partial update; absent fields keep their value
async fn patch_settings(
    State(state): State<Arc<SettingsApiState>>,
    headers: HeaderMap,
    Json(patch): Json<SettingsPatch>,
) -> impl IntoResponse {
    let principal = principal_from(&headers);

    match state.store.update_settings(patch).await {
        Ok(updated) => {
            state
                .audit
                .record(
                    AuditEntry::builder(AuditAction::SettingsChanged, &principal.id)
                        .detail(format!(
                            "retention_days={}, notifications_enabled={}",
                            updated.retention_days, updated.notifications_enabled
                        ))
                        .build(),
                )
                .await;
            (StatusCode::OK, Json(updated)).into_response()
        }
        // A patch the store refuses is the caller's mistake, not ours.
        Err(SettingsError::Invalid(reason)) => {
            error_response(OrchestratorError::validation(reason))
        }
    }
}
