//! HTTP surface for browser clients joining the bot's room.
//!
//! Two routes: `/health` for liveness checks and `POST /connect`, which mints
//! a LiveKit join token so a client can enter the room the bot is listening in.

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crosstalk_voice::RoomTransport;

/// Application state shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Room service client used to mint join tokens.
    pub transport: Arc<RoomTransport>,
    /// Room every `/connect` token admits to.
    pub room_name: String,
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/connect", post(connect_handler))
        .layer(Extension(Arc::new(state)))
}

/// Health check handler.
///
/// Returns `200 OK` with service status and version. Used by load balancers,
/// monitoring, and CI to verify the bot is running.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Serialize)]
pub struct IceServerResponse {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub credential: String,
}

#[derive(Serialize)]
pub struct ConnectResponse {
    pub token: String,
    pub url: String,
    pub room: String,
    pub ice_servers: Vec<IceServerResponse>,
}

/// POST /connect
///
/// Mints a join token for a fresh participant identity and returns the
/// connection details a WebRTC client needs.
pub async fn connect_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<ConnectResponse>, (StatusCode, String)> {
    if !state.transport.is_enabled() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            json!({
                "error": "voice_not_configured",
                "message": "Voice is not configured. Set up LiveKit credentials to enable the room.",
                "setup_hint": "Configure livekit.url, livekit.api_key, and livekit.api_secret in bot.toml or use CROSSTALK_LIVEKIT_* environment variables."
            })
            .to_string(),
        ));
    }

    let identity = format!("user-{}", Uuid::new_v4());
    let token = state
        .transport
        .mint_join_token(&state.room_name, &identity, "Guest")
        .map_err(|e| {
            tracing::error!("failed to mint LiveKit join token: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate join token".to_string(),
            )
        })?;

    let ice_servers: Vec<IceServerResponse> = state
        .transport
        .ice_servers()
        .iter()
        .map(|s| IceServerResponse {
            urls: s.urls.clone(),
            username: s.username.clone(),
            credential: s.credential.clone(),
        })
        .collect();

    Ok(Json(ConnectResponse {
        token,
        url: state.transport.public_url().to_string(),
        room: state.room_name.clone(),
        ice_servers,
    }))
}
