use serde::{Deserialize, Serialize};

use crate::types::Settings;

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// The user's question.
    pub message: String,

    /// Backend session the question belongs to.
    pub session_id: String,

    /// Optional backend selection.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub settings: Option<Settings>,
}

impl ChatRequest {
    /// Create a request without settings.
    pub fn new(message: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: session_id.into(),
            settings: None,
        }
    }

    /// Attach backend settings.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn request_minimal() {
        let request = ChatRequest::new("hi", "default");
        assert_eq!(
            to_value(&request).unwrap(),
            json!({"message": "hi", "session_id": "default"})
        );
    }

    #[test]
    fn request_with_settings() {
        let request = ChatRequest::new("hi", "s-1").with_settings(Settings::default());
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "message": "hi",
                "session_id": "s-1",
                "settings": {"llm": "gemma-27b", "vectorDb": "qdrant"}
            })
        );
    }
}
