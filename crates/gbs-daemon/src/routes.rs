//! Axum router for gbs-daemon.
//!
//! Middleware layers (tracing) are **not** applied here; `main.rs` attaches
//! them after `build_router` so tests can use the bare router.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};

use crate::{
    api_types::{HealthResponse, StatusResponse},
    state::{uptime_secs, AppState},
};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .with_state(state)
}

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let regs = &st.registries;
    (
        StatusCode::OK,
        Json(StatusResponse {
            uptime_secs: uptime_secs(),
            online_devices: regs.online.len(),
            platforms: regs.platforms.len(),
            terminals: regs.terminals.len(),
            recovery: st.recovery.clone(),
        }),
    )
}
