mod admin;
mod conversations;
mod health;
mod messages;
mod metrics;

pub use admin::admin_stats;
pub use conversations::{conversation_messages, create_conversation, list_conversations};
pub use health::health_handler;
pub use messages::send_message;
pub use metrics::metrics_handler;
