// Public modules
pub mod chat;
pub mod client;
pub mod dashboard;
pub mod error;
pub mod observability;
pub mod render;
pub mod store;
pub mod types;
pub mod upload;
pub mod utils;

// Re-exports
pub use client::{API_URL_ENV, DEFAULT_API_URL, ProgressSender, RagBackend, RagClient, TransferProgress};
pub use dashboard::{DashboardStats, StatsWidget, Trend};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use store::{InMemoryStore, SessionStore, load_transcript, save_transcript};
pub use types::*;
pub use upload::{BatchOutcome, UploadBatcher, UploadObserver, UploadPolicy, UploadQueue};
