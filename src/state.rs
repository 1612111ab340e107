use std::sync::Arc;

use tokio::sync::mpsc;

use crate::middleware::{AccessHours, KeyStrategy, RoutePredicate};
use crate::models::QueuedMessage;
use crate::rate_limit::RateLimiter;
use crate::store::ChatStore;

// app's shared state
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
    pub route_predicate: RoutePredicate,
    pub key_strategy: KeyStrategy,
    pub access_hours: AccessHours,
    pub store: Arc<ChatStore>,
    pub delivery_tx: mpsc::Sender<QueuedMessage>,
}
