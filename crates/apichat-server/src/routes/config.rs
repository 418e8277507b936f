//! Config routes — endpoint and API key management.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tracing::warn;

use crate::state::AppState;
use apichat_chat::{ConfigUpdate, ConfigView};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/config", get(get_config).post(update_config))
}

/// GET /config — endpoint and whether a key is set. The key itself is never returned.
async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigView> {
    Json(state.config_store.describe())
}

/// POST /config — merge, validate and persist.
async fn update_config(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConfigUpdate>, JsonRejection>,
) -> impl IntoResponse {
    let Json(update) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return (
                rejection.status(),
                Json(serde_json::json!({ "error": rejection.body_text() })),
            );
        }
    };

    match state.config_store.update(&update) {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({ "ok": true, "has_api_key": outcome.has_api_key })),
        ),
        Err(e) => {
            let status = if e.is_user_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            warn!("Config update rejected: {}", e);
            (status, Json(serde_json::json!({ "error": e.to_string() })))
        }
    }
}
