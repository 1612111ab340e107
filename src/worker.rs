use std::sync::Arc;

use tokio::sync::mpsc;

use crate::metrics::MESSAGES_TOTAL;
use crate::models::QueuedMessage;
use crate::store::ChatStore;

// Background worker - drains the delivery queue and writes messages to
// the store one by one, replying to the waiting handler over oneshot.
pub async fn delivery_worker(mut rx: mpsc::Receiver<QueuedMessage>, store: Arc<ChatStore>) {
    tracing::info!("delivery worker started");

    while let Some(queued) = rx.recv().await {
        let QueuedMessage {
            request,
            sender,
            response_tx,
        } = queued;

        let result = store.append_message(request.conversation, sender, request.message_body);
        match &result {
            Ok(message) => {
                MESSAGES_TOTAL.inc();
                tracing::debug!(
                    conversation = %message.conversation,
                    sender = message.sender.as_str(),
                    "message stored"
                );
            }
            Err(err) => tracing::warn!(error = %err, "message rejected"),
        }

        // the sending handler may have given up waiting, that's fine
        let _ = response_tx.send(result);
    }
}
