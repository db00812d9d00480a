use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::{Citation, MessageRole};

/// Greeting placed at the top of every new chat.
pub const WELCOME_MESSAGE: &str = "Hello! I'm your RAG assistant. I can help you query documents, \
find information, and answer questions based on your knowledge base. How can I help you today?";

/// A single message in a chat.
///
/// Messages are immutable once created; a chat only ever appends them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Unique identifier of the message.
    pub id: String,

    /// Who wrote the message.
    pub role: MessageRole,

    /// Text content, rendered verbatim.
    pub content: String,

    /// When the message was created.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,

    /// Sources backing an assistant reply.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub citations: Option<Vec<Citation>>,
}

impl Message {
    /// Create a message with a fresh id and the current time.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: OffsetDateTime::now_utc(),
            citations: None,
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// The assistant greeting that opens a new chat.
    pub fn welcome() -> Self {
        Self::assistant(WELCOME_MESSAGE)
    }

    /// Attach citations.  An empty list is stored as `None`.
    pub fn with_citations(mut self, citations: Option<Vec<Citation>>) -> Self {
        self.citations = citations.filter(|c| !c.is_empty());
        self
    }

    /// Returns true if this message was written by the user.
    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    /// Citations attached to the message, or an empty slice.
    pub fn citations(&self) -> &[Citation] {
        self.citations.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_has_no_citations() {
        let message = Message::user("What documents are available?");
        assert!(message.is_user());
        assert_eq!(message.content, "What documents are available?");
        assert!(message.citations().is_empty());
        let json = serde_json::to_value(&message).unwrap();
        assert!(json.get("citations").is_none());
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn empty_citations_collapse_to_none() {
        let message = Message::assistant("nothing cited").with_citations(Some(Vec::new()));
        assert!(message.citations.is_none());
    }

    #[test]
    fn message_round_trips_timestamp() {
        let message = Message::assistant("answer")
            .with_citations(Some(vec![Citation::new("a.pdf", "Page 1")]));
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, message.id);
        assert_eq!(back.timestamp.unix_timestamp(), message.timestamp.unix_timestamp());
        assert_eq!(back.citations().len(), 1);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(Message::welcome().id, Message::welcome().id);
    }
}
