use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

use crate::models::CreateConversationRequest;
use crate::state::AppState;

pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateConversationRequest>,
) -> impl IntoResponse {
    let conversation = state.store.create_conversation(payload.participants);
    (StatusCode::CREATED, Json(conversation))
}

pub async fn list_conversations(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.conversations())
}

pub async fn conversation_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.store.messages(id) {
        Ok(messages) => Json(messages).into_response(),
        Err(err) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}
