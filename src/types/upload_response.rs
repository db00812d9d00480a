use serde::{Deserialize, Serialize};

/// Body returned by `POST /upload` and `POST /upload/google-drive`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    /// Name the backend stored the document under.
    pub filename: String,

    /// Backend-defined ingestion status.
    pub status: String,

    /// Human-readable detail.
    pub message: String,
}

/// Body of `POST /upload/google-drive`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoogleDriveUploadRequest {
    /// Drive identifier of the file to import.
    pub file_id: String,
}

impl GoogleDriveUploadRequest {
    /// Create a request for the given Drive file.
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
        }
    }
}
