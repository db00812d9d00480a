use serde::{Deserialize, Serialize};

/// A source reference attached to an assistant reply.
///
/// Citations are displayed as returned by the backend and never validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    /// Label of the cited document, usually its file name.
    pub source: String,

    /// Locator of the excerpt within the document, e.g. "Page 5, Section 2.1".
    pub chunk: String,
}

impl Citation {
    /// Create a new citation.
    pub fn new(source: impl Into<String>, chunk: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            chunk: chunk.into(),
        }
    }
}
