use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tokio::sync::oneshot;

use crate::middleware::identity;
use crate::models::{QueuedMessage, SendMessageRequest};
use crate::state::AppState;

// Queues the message for the delivery worker and waits for the stored copy
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SendMessageRequest>,
) -> Response {
    let sender = identity::username(&headers)
        .unwrap_or("anonymous")
        .to_string();

    let (response_tx, response_rx) = oneshot::channel();
    let queued = QueuedMessage {
        request: payload,
        sender,
        response_tx,
    };

    if state.delivery_tx.send(queued).await.is_err() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Failed to queue message" })),
        )
            .into_response();
    }

    match response_rx.await {
        Ok(Ok(message)) => (StatusCode::CREATED, Json(message)).into_response(),
        Ok(Err(err)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Delivery worker failed to respond" })),
        )
            .into_response(),
    }
}
