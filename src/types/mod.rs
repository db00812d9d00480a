// Public modules
pub mod chat;
pub mod chat_request;
pub mod chat_response;
pub mod citation;
pub mod health_response;
pub mod message;
pub mod message_role;
pub mod settings;
pub mod upload_response;
pub mod uploaded_file;

// Re-exports
pub use chat::{Chat, DEFAULT_CHAT_TITLE, TITLE_MAX_CHARS, title_from_message};
pub use chat_request::ChatRequest;
pub use chat_response::ChatResponse;
pub use citation::Citation;
pub use health_response::HealthResponse;
pub use message::{Message, WELCOME_MESSAGE};
pub use message_role::{MessageRole, MessageRoleParseError};
pub use settings::{AVAILABLE_LLMS, AVAILABLE_VECTOR_DBS, CatalogEntry, Settings};
pub use upload_response::{GoogleDriveUploadRequest, UploadResponse};
pub use uploaded_file::{UploadStatus, UploadedFile, format_file_size};
