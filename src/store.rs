use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown conversation {0}")]
    UnknownConversation(Uuid),
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub conversation_id: Uuid,
    pub participants: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message_id: Uuid,
    pub conversation: Uuid,
    pub sender: String,
    pub message_body: String,
    pub sent_at: DateTime<Utc>,
}

// In-memory backing store for conversations and their messages
pub struct ChatStore {
    conversations: DashMap<Uuid, Conversation>,
    messages: DashMap<Uuid, Vec<Message>>,
}

impl ChatStore {
    pub fn new() -> Self {
        Self {
            conversations: DashMap::new(),
            messages: DashMap::new(),
        }
    }

    pub fn create_conversation(&self, participants: Vec<String>) -> Conversation {
        let conversation = Conversation {
            conversation_id: Uuid::new_v4(),
            participants,
            created_at: Utc::now(),
        };
        self.conversations
            .insert(conversation.conversation_id, conversation.clone());
        self.messages.insert(conversation.conversation_id, Vec::new());
        conversation
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        let mut all: Vec<Conversation> = self
            .conversations
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|c| c.created_at);
        all
    }

    // The existence check and the append run under one entry guard so a
    // message can never land in a conversation deleted in between.
    pub fn append_message(
        &self,
        conversation: Uuid,
        sender: String,
        body: String,
    ) -> Result<Message, StoreError> {
        let mut entry = self
            .messages
            .get_mut(&conversation)
            .ok_or(StoreError::UnknownConversation(conversation))?;

        let message = Message {
            message_id: Uuid::new_v4(),
            conversation,
            sender,
            message_body: body,
            sent_at: Utc::now(),
        };
        entry.value_mut().push(message.clone());
        Ok(message)
    }

    pub fn messages(&self, conversation: Uuid) -> Result<Vec<Message>, StoreError> {
        self.messages
            .get(&conversation)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::UnknownConversation(conversation))
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.iter().map(|entry| entry.value().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_conversation_is_listed() {
        let store = ChatStore::new();
        let conversation = store.create_conversation(vec!["alice".into(), "bob".into()]);

        let all = store.conversations();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].conversation_id, conversation.conversation_id);
        assert_eq!(all[0].participants, vec!["alice", "bob"]);
    }

    #[test]
    fn messages_append_in_order() {
        let store = ChatStore::new();
        let conversation = store.create_conversation(vec!["alice".into()]);

        store
            .append_message(conversation.conversation_id, "alice".into(), "hi".into())
            .unwrap();
        store
            .append_message(conversation.conversation_id, "alice".into(), "there".into())
            .unwrap();

        let messages = store.messages(conversation.conversation_id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message_body, "hi");
        assert_eq!(messages[1].message_body, "there");
        assert_eq!(store.message_count(), 2);
    }

    #[test]
    fn unknown_conversation_is_an_error() {
        let store = ChatStore::new();
        let missing = Uuid::new_v4();

        assert!(matches!(
            store.append_message(missing, "alice".into(), "hi".into()),
            Err(StoreError::UnknownConversation(id)) if id == missing
        ));
        assert!(store.messages(missing).is_err());
    }
}
