use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::{Message, MessageRole};

/// Title given to a chat until its first user message arrives.
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// Maximum number of characters of the first user message kept in a title.
pub const TITLE_MAX_CHARS: usize = 30;

/// A conversation: an ordered, append-only list of messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    /// Unique identifier of the chat.
    pub id: String,

    /// Display title.
    pub title: String,

    /// Time of the last activity in this chat.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,

    /// Messages in insertion order.
    pub messages: Vec<Message>,
}

impl Chat {
    /// Create a new chat titled "New Chat" and seeded with the welcome message.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_CHAT_TITLE.to_string(),
            timestamp: OffsetDateTime::now_utc(),
            messages: vec![Message::welcome()],
        }
    }

    /// Append a message and bump the last-activity time.
    pub fn push(&mut self, message: Message) {
        if message.timestamp > self.timestamp {
            self.timestamp = message.timestamp;
        }
        self.messages.push(message);
    }

    /// The most recent message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages written by the user.
    pub fn user_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_user()).count()
    }

    /// True while the last message is from the user, i.e. a reply is pending.
    pub fn is_awaiting_reply(&self) -> bool {
        self.last_message()
            .is_some_and(|m| m.role == MessageRole::User)
    }

    /// True if the chat still carries the placeholder title.
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_CHAT_TITLE
    }
}

impl Default for Chat {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a chat title from the first user message.
///
/// Keeps the first [`TITLE_MAX_CHARS`] characters and appends `...` when the
/// message was longer.
pub fn title_from_message(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
