//! HTTP route definitions and handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use scrubber_core::{CommandResponse, ControlHandle, DebugEntry, PingResponse, Stats};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::websocket::ws_handler;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugRequest {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub running: bool,
    pub paused: bool,
    pub status: String,
    pub stats: Stats,
}

/// Build the control router around a gateway handle.
pub fn create_router(handle: ControlHandle) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/stats", get(stats))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/pause", post(pause))
        .route("/resume", post(resume))
        .route(
            "/debug",
            get(debug_entries).post(toggle_debug).delete(clear_debug),
        )
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(handle)
}

async fn ping(State(handle): State<ControlHandle>) -> Json<PingResponse> {
    Json(handle.ping())
}

async fn stats(State(handle): State<ControlHandle>) -> Json<StatsResponse> {
    Json(StatsResponse {
        running: handle.is_running(),
        paused: handle.is_paused(),
        status: handle.status(),
        stats: handle.stats(),
    })
}

/// The body is optional: an empty request starts with the configured
/// defaults. A rejected start is still a 200 with `success: false`.
async fn start(State(handle): State<ControlHandle>, body: Bytes) -> Response {
    let overrides = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Rejected start body: {}", e);
                return (
                    StatusCode::BAD_REQUEST,
                    Json(CommandResponse::rejected(format!("Invalid JSON: {e}"))),
                )
                    .into_response();
            }
        }
    };
    Json(handle.start(overrides.as_ref()).await).into_response()
}

async fn stop(State(handle): State<ControlHandle>) -> Json<CommandResponse> {
    Json(handle.stop())
}

async fn pause(State(handle): State<ControlHandle>) -> Json<CommandResponse> {
    Json(handle.pause())
}

async fn resume(State(handle): State<ControlHandle>) -> Json<CommandResponse> {
    Json(handle.resume())
}

async fn toggle_debug(
    State(handle): State<ControlHandle>,
    Json(request): Json<DebugRequest>,
) -> Json<CommandResponse> {
    Json(handle.toggle_debug(request.enabled).await)
}

/// The debug subscriber's recent entries, oldest first.
async fn debug_entries(State(handle): State<ControlHandle>) -> Json<Vec<DebugEntry>> {
    Json(handle.debug_entries())
}

async fn clear_debug(State(handle): State<ControlHandle>) -> Json<CommandResponse> {
    Json(handle.clear_debug())
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
