use serde::Deserialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::store::{Message, StoreError};

// POST /api/conversations body
#[derive(Deserialize)]
pub struct CreateConversationRequest {
    pub participants: Vec<String>,
}

// POST /api/messages body
#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub conversation: Uuid,
    pub message_body: String,
}

// Queued send - holds the request + one-time channel for the stored message
pub struct QueuedMessage {
    pub request: SendMessageRequest,
    pub sender: String,
    pub response_tx: oneshot::Sender<Result<Message, StoreError>>,
}
