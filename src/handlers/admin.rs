use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

// Operational counters, only reachable through the role check
pub async fn admin_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "conversations": state.store.conversation_count(),
        "messages": state.store.message_count(),
        "tracked_clients": state.limiter.tracked_keys(),
    }))
}
