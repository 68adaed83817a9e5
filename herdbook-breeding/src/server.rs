//! HTTP server for herdbook-breeding

use axum::{
    http::StatusCode,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers;
use crate::groups::LinkageService;

/// Application state
pub struct AppState {
    pub db: SqlitePool,
    pub linkage: LinkageService,
}

/// Build the service router
pub fn router(db: SqlitePool) -> Router {
    let state = Arc::new(AppState {
        linkage: LinkageService::new(db.clone()),
        db,
    });

    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
        .route("/plans/:plan_id/group", post(handlers::ensure_group))
        .route("/groups/:group_id/link", post(handlers::link_group))
        .route("/groups/:group_id/unlink", post(handlers::unlink_group))
        .route("/groups/:group_id/suggestions", get(handlers::group_suggestions))
        .route("/groups/:group_id/summary", get(handlers::group_summary))
        .route("/groups/:group_id/events", get(handlers::group_events))
        .route("/groups/:group_id/offspring", post(handlers::create_offspring))
        .route("/offspring/:offspring_id", patch(handlers::patch_offspring))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start(bind_addr: &str, db: SqlitePool) -> anyhow::Result<()> {
    let app = router(db);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("HTTP server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

/// Health check endpoint
async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Status endpoint
async fn status() -> Json<serde_json::Value> {
    Json(json!({
        "service": "herdbook-breeding",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}
