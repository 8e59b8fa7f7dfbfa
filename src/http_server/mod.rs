//! # HTTP Server
//!
//! Thin REST boundary over the orchestrators: trigger endpoints for
//! backup and restore, read-only ledger queries, restore status
//! polling, and runtime settings. Handlers map `OrchestratorError`
//! onto status codes through [`crate::errors::ErrorResponse`]; no
//! business logic lives here.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::{ErrorResponse, OrchestratorError};
use crate::restore::RestoreOrchestrator;
use crate::workspace::Principal;

pub mod backup_routes;
pub mod restore_routes;
pub mod settings_routes;

pub use backup_routes::BackupApiState;
pub use settings_routes::SettingsApiState;

/// Header naming the operator behind a request, for audit attribution.
/// Authentication is the deployment's concern, not this crate's.
const OPERATOR_HEADER: &str = "x-operator";

/// Assemble the full application router
pub fn build_router(
    backup: Arc<BackupApiState>,
    restore: Arc<RestoreOrchestrator>,
    settings: Arc<SettingsApiState>,
) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(backup_routes::backup_routes(backup))
        .merge(restore_routes::restore_routes(restore))
        .merge(settings_routes::settings_routes(settings))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Bind and run until the process is stopped
pub async fn serve(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "http server listening");
    axum::serve(listener, app).await
}

/// GET /health - liveness
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Operator identity from the request headers, defaulting to "api"
pub(crate) fn principal_from(headers: &HeaderMap) -> Principal {
    headers
        .get(OPERATOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|name| !name.is_empty())
        .map(Principal::operator)
        .unwrap_or_else(|| Principal::operator("api"))
}

/// Convert error to HTTP response
pub(crate) fn error_response(err: OrchestratorError) -> axum::response::Response {
    let status = match err.status_code() {
        400 => StatusCode::BAD_REQUEST,
        404 => StatusCode::NOT_FOUND,
        409 => StatusCode::CONFLICT,
        422 => StatusCode::UNPROCESSABLE_ENTITY,
        502 => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(ErrorResponse::from(err))).into_response()
}
