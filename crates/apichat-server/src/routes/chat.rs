//! Chat route: relays one message and streams the upstream reply back.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tokio_stream::StreamExt;

use crate::state::AppState;
use apichat_chat::ChatRequest;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// POST /chat — `text/event-stream` of passthrough lines, possibly ending in
/// a `data: {"error": ...}` event.
async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    let events = state
        .relay
        .relay(req.message)
        .map(|event| Ok::<_, Infallible>(event.to_wire()));

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(events),
    )
        .into_response()
}
