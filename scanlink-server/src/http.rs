use crate::relay::RelayHandle;
use crate::room::RoomSummary;
use crate::signaling::{SignalingService, ws_handler};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use scanlink_core::epoch_millis;
use serde::Serialize;

#[derive(Clone)]
pub struct AppState {
    pub signaling: SignalingService,
    pub relay: RelayHandle,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub rooms: usize,
    pub connections: usize,
    pub server_time: i64,
}

/// The full signaling surface: the WebSocket endpoint plus the health and
/// room-introspection routes external tooling reads.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/rooms", get(list_rooms))
        .route("/rooms/{id}", get(room_detail))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let rooms = state
        .relay
        .snapshot()
        .await
        .map(|s| s.rooms.len())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "ok",
        rooms,
        connections: state.signaling.connection_count(),
        server_time: epoch_millis(),
    })
}

async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    let rooms = state
        .relay
        .snapshot()
        .await
        .map(|s| s.rooms)
        .unwrap_or_default();
    Json(rooms)
}

async fn room_detail(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RoomSummary>, StatusCode> {
    state
        .relay
        .snapshot()
        .await
        .and_then(|s| s.rooms.into_iter().find(|room| room.id == id))
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
