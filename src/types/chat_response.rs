use serde::{Deserialize, Serialize};

use crate::types::Citation;

/// Body returned by `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    /// The assistant's answer.
    pub response: String,

    /// Sources the answer was grounded on.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub citations: Option<Vec<Citation>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_without_citations() {
        let response: ChatResponse = serde_json::from_value(json!({"response": "hi"})).unwrap();
        assert_eq!(response.response, "hi");
        assert!(response.citations.is_none());
    }

    #[test]
    fn response_with_citations() {
        let response: ChatResponse = serde_json::from_value(json!({
            "response": "See the report.",
            "citations": [
                {"source": "document_1.pdf", "chunk": "Page 5, Section 2.1"},
                {"source": "document_2.pdf", "chunk": "Page 12, Section 4.3"}
            ]
        }))
        .unwrap();
        let citations = response.citations.unwrap();
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[1].source, "document_2.pdf");
    }
}
