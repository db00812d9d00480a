//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the session store,
//! the upload queue, and the backend, and implements the send flow: append the
//! user's message, ask the backend, append the reply.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::chat::config::ChatConfig;
use crate::client::RagBackend;
use crate::dashboard::DashboardStats;
use crate::error::{Error, Result};
use crate::observability::{CHAT_SEND_FAILURES, CHAT_SENDS};
use crate::render::Renderer;
use crate::store::{InMemoryStore, SessionStore, load_transcript, save_transcript};
use crate::types::{
    Chat, ChatRequest, HealthResponse, Message, MessageRole, Settings, UploadResponse,
    UploadedFile, title_from_message,
};
use crate::upload::{BatchOutcome, UploadBatcher, UploadQueue};

/// Prefix of the assistant message appended when the backend cannot answer.
pub const SEND_FAILURE_REPLY: &str = "Sorry, I couldn't get an answer from the assistant";

/// A chat session: chats, uploads, and the backend they talk to.
///
/// Every operation that changes state takes `&mut self`, so a session handles
/// one request at a time.
pub struct ChatSession<B: RagBackend, S: SessionStore = InMemoryStore> {
    backend: B,
    store: S,
    config: ChatConfig,
    uploads: UploadQueue,
    request_count: u64,
    failed_requests: u64,
    documents_uploaded: usize,
    upload_failures: usize,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Number of chats.
    pub chats: usize,
    /// Messages across all chats, welcome messages included.
    pub messages: usize,
    /// Messages typed by the user.
    pub user_messages: usize,
    /// Replies, welcome messages, and failure notices.
    pub assistant_messages: usize,
    /// Backend calls made.
    pub requests: u64,
    /// Backend calls that failed.
    pub failed_requests: u64,
    /// Documents the backend accepted.
    pub documents_uploaded: usize,
    /// Documents that failed validation or transfer.
    pub upload_failures: usize,
}

impl<B: RagBackend> ChatSession<B, InMemoryStore> {
    /// Creates a new chat session with an in-memory store holding one new chat.
    pub fn new(backend: B, config: ChatConfig) -> Self {
        Self::with_store(backend, InMemoryStore::with_new_chat(), config)
    }
}

impl<B: RagBackend, S: SessionStore> ChatSession<B, S> {
    /// Creates a new chat session over an existing store.
    ///
    /// An empty store gets a new chat; a store without an active chat has its
    /// first chat selected.
    pub fn with_store(backend: B, mut store: S, config: ChatConfig) -> Self {
        if store.chats().is_empty() {
            store.create_chat();
        } else if store.active_chat().is_none() {
            let first = store.chats()[0].id.clone();
            store.set_active_id(Some(first));
        }
        Self {
            backend,
            store,
            config,
            uploads: UploadQueue::new(),
            request_count: 0,
            failed_requests: 0,
            documents_uploaded: 0,
            upload_failures: 0,
        }
    }

    /// Sends a user message to the active chat and records the reply.
    ///
    /// Input is trimmed; empty input is ignored and returns `Ok(None)`.
    /// Otherwise exactly one user message is appended before the backend is
    /// called, and exactly one assistant message after: the backend's answer,
    /// or a failure notice if the call did not succeed.  The appended
    /// assistant message is returned.
    ///
    /// # Errors
    ///
    /// Backend failures are not errors.  An error means the session has no
    /// active chat.
    pub async fn send_message(
        &mut self,
        input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<Option<Message>> {
        let content = input.trim();
        if content.is_empty() {
            return Ok(None);
        }
        let chat_id = self.active_chat_id()?;
        let first_user_message = self
            .store
            .chat(&chat_id)
            .map(|chat| chat.has_default_title() && chat.user_message_count() == 0)
            .unwrap_or(false);

        self.store.append_message(&chat_id, Message::user(content))?;
        if first_user_message {
            self.store
                .set_title(&chat_id, title_from_message(content))?;
        }

        CHAT_SENDS.click();
        renderer.print_typing();
        let request = ChatRequest::new(content, self.config.session_id.clone())
            .with_settings(self.config.settings.clone());
        self.request_count += 1;
        let reply = match self.backend.send_message(&request).await {
            Ok(response) => Message::assistant(response.response).with_citations(response.citations),
            Err(err) => {
                CHAT_SEND_FAILURES.click();
                self.failed_requests += 1;
                tracing::warn!(chat_id = %chat_id, error = %err, "chat request failed");
                Message::assistant(format!("{SEND_FAILURE_REPLY}: {err}"))
            }
        };

        self.store.append_message(&chat_id, reply.clone())?;
        renderer.print_message(&reply);
        Ok(Some(reply))
    }

    /// Starts a new chat and makes it active.
    pub fn new_chat(&mut self) -> &Chat {
        self.store.create_chat()
    }

    /// Makes the chat with `id` active.
    pub fn select_chat(&mut self, id: &str) -> Result<()> {
        self.store.select_chat(id)
    }

    /// Makes a chat active by 1-based position in [`chats`](Self::chats) or by id.
    pub fn switch_chat(&mut self, target: &str) -> Result<&Chat> {
        let target = target.trim();
        let id = match target.parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.store.chats().len() => self.store.chats()[n - 1].id.clone(),
            Ok(_) => {
                return Err(Error::not_found(
                    format!("no chat number {target}"),
                    Some(target.to_string()),
                ));
            }
            Err(_) => target.to_string(),
        };
        self.store.select_chat(&id)?;
        self.store
            .active_chat()
            .ok_or_else(|| Error::not_found("no such chat", Some(id)))
    }

    /// All chats, newest first.
    pub fn chats(&self) -> &[Chat] {
        self.store.chats()
    }

    /// The active chat.
    pub fn active_chat(&self) -> Option<&Chat> {
        self.store.active_chat()
    }

    /// True while the active chat's last message is from the user.
    pub fn is_awaiting_reply(&self) -> bool {
        self.store
            .active_chat()
            .map(Chat::is_awaiting_reply)
            .unwrap_or(false)
    }

    /// The session store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The resolved configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Model and vector database selection.
    pub fn settings(&self) -> &Settings {
        &self.config.settings
    }

    /// Changes the language model; the id must be in the catalog.
    pub fn set_llm(&mut self, llm: &str) -> Result<()> {
        self.config.settings.set_llm(llm)
    }

    /// Changes the vector database; the id must be in the catalog.
    pub fn set_vector_db(&mut self, vector_db: &str) -> Result<()> {
        self.config.settings.set_vector_db(vector_db)
    }

    /// The uploader's entries.
    pub fn uploads(&self) -> &UploadQueue {
        &self.uploads
    }

    /// Removes an uploader entry.
    pub fn dismiss_upload(&mut self, id: &str) -> Result<UploadedFile> {
        self.uploads.dismiss(id)
    }

    /// Removes every finished uploader entry.
    pub fn clear_finished_uploads(&mut self) -> usize {
        self.uploads.clear_finished()
    }

    /// Validates and uploads `paths`, then tells the assistant what arrived.
    ///
    /// Per-file failures are reported through `renderer` and in the returned
    /// outcome.  When at least one file succeeded, `I've uploaded: ...` is
    /// sent to the active chat as a user message.
    pub async fn upload_files(
        &mut self,
        paths: &[PathBuf],
        renderer: &mut dyn Renderer,
    ) -> Result<BatchOutcome> {
        let batcher = UploadBatcher::new(
            self.config.upload_policy.clone(),
            self.config.session_id.clone(),
        );
        let outcome = batcher
            .run(&self.backend, &mut self.uploads, paths, &mut *renderer)
            .await;
        self.request_count += outcome.transferred as u64;
        self.failed_requests += outcome
            .transferred
            .saturating_sub(outcome.succeeded.len()) as u64;
        self.documents_uploaded += outcome.succeeded.len();
        self.upload_failures += outcome.failed.len();

        if let Some(summary) = outcome.summary_message() {
            self.send_message(&summary, renderer).await?;
        }
        Ok(outcome)
    }

    /// Imports a document straight from Google Drive.
    pub async fn import_from_drive(&mut self, file_id: &str) -> Result<UploadResponse> {
        let batcher = UploadBatcher::new(
            self.config.upload_policy.clone(),
            self.config.session_id.clone(),
        );
        let result = batcher.import_from_drive(&self.backend, file_id).await;
        match &result {
            Ok(_) => {
                self.request_count += 1;
                self.documents_uploaded += 1;
            }
            Err(err) if err.is_validation() => {}
            Err(_) => {
                self.request_count += 1;
                self.failed_requests += 1;
                self.upload_failures += 1;
            }
        }
        result
    }

    /// Asks the backend whether it is healthy.
    pub async fn health(&mut self) -> Result<HealthResponse> {
        self.request_count += 1;
        let result = self.backend.health().await;
        if result.is_err() {
            self.failed_requests += 1;
        }
        result
    }

    /// Saves every chat to `path`.
    pub fn save_transcript<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_transcript(&self.store, path)
    }

    /// Replaces every chat with the contents of `path`.
    pub fn load_transcript<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        load_transcript(&mut self.store, path)?;
        if self.store.chats().is_empty() {
            self.store.create_chat();
        }
        Ok(())
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let mut stats = SessionStats {
            chats: self.store.chats().len(),
            requests: self.request_count,
            failed_requests: self.failed_requests,
            documents_uploaded: self.documents_uploaded,
            upload_failures: self.upload_failures,
            ..Default::default()
        };
        for message in self.store.chats().iter().flat_map(|chat| &chat.messages) {
            stats.messages += 1;
            match message.role {
                MessageRole::User => stats.user_messages += 1,
                MessageRole::Assistant => stats.assistant_messages += 1,
            }
        }
        stats
    }

    /// Numbers for the dashboard.
    pub fn dashboard(&self) -> DashboardStats {
        DashboardStats::from_session(&self.stats())
    }

    fn active_chat_id(&self) -> Result<String> {
        self.store
            .active_id()
            .map(str::to_string)
            .ok_or_else(|| Error::not_found("no active chat", None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::client::ProgressSender;
    use crate::render::PlainTextRenderer;
    use crate::types::{ChatResponse, Citation, DEFAULT_CHAT_TITLE, WELCOME_MESSAGE};

    /// Backend double that records requests and answers from a script.
    #[derive(Default)]
    struct ScriptedBackend {
        fail_chat: bool,
        citations: Option<Vec<Citation>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait::async_trait]
    impl RagBackend for ScriptedBackend {
        async fn send_message(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_chat {
                return Err(Error::api(500, "Failed to send message", None));
            }
            Ok(ChatResponse {
                response: format!("echo: {}", request.message),
                citations: self.citations.clone(),
            })
        }

        async fn upload_file(
            &self,
            _path: &Path,
            file_name: &str,
            _session_id: &str,
            _progress: Option<ProgressSender>,
        ) -> Result<UploadResponse> {
            Ok(UploadResponse {
                filename: file_name.to_string(),
                status: "success".to_string(),
                message: "indexed".to_string(),
            })
        }

        async fn upload_from_google_drive(&self, _file_id: &str) -> Result<UploadResponse> {
            Err(Error::connection("drive unreachable", None))
        }

        async fn health(&self) -> Result<HealthResponse> {
            Ok(HealthResponse {
                status: "ok".to_string(),
            })
        }
    }

    fn quiet() -> PlainTextRenderer {
        PlainTextRenderer::with_writer(Box::new(std::io::sink()), false)
    }

    fn session(backend: ScriptedBackend) -> ChatSession<ScriptedBackend> {
        ChatSession::new(backend, ChatConfig::default())
    }

    #[test]
    fn new_session_has_welcome_chat() {
        let session = session(ScriptedBackend::default());
        let chat = session.active_chat().unwrap();
        assert_eq!(chat.title, DEFAULT_CHAT_TITLE);
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].content, WELCOME_MESSAGE);
        assert!(!session.is_awaiting_reply());
    }

    #[tokio::test]
    async fn empty_input_never_sends() {
        let mut session = session(ScriptedBackend::default());
        let mut renderer = quiet();
        for input in ["", "   ", "\n\t"] {
            assert!(session.send_message(input, &mut renderer).await.unwrap().is_none());
        }
        assert!(session.backend().requests.lock().unwrap().is_empty());
        assert_eq!(session.active_chat().unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn send_appends_user_then_assistant() {
        let backend = ScriptedBackend {
            citations: Some(vec![
                Citation::new("document_1.pdf", "Page 5, Section 2.1"),
                Citation::new("document_2.pdf", "Page 12, Section 4.3"),
            ]),
            ..Default::default()
        };
        let mut session = session(backend);
        let mut renderer = quiet();

        let reply = session
            .send_message("  What documents are available?  ", &mut renderer)
            .await
            .unwrap()
            .unwrap();

        let chat = session.active_chat().unwrap();
        assert_eq!(chat.messages.len(), 3);
        assert_eq!(chat.messages[1].role, MessageRole::User);
        assert_eq!(chat.messages[1].content, "What documents are available?");
        assert_eq!(chat.messages[2], reply);
        assert_eq!(reply.citations().len(), 2);
        assert_eq!(chat.title, "What documents are available?");

        let requests = session.backend().requests.lock().unwrap();
        assert_eq!(requests[0].message, "What documents are available?");
        assert_eq!(requests[0].session_id, "default");
        assert_eq!(requests[0].settings, Some(Settings::default()));
    }

    #[tokio::test]
    async fn title_updates_once_and_truncates() {
        let mut session = session(ScriptedBackend::default());
        let mut renderer = quiet();
        let long = "Explain the retrieval pipeline in great detail please";
        session.send_message(long, &mut renderer).await.unwrap();
        let title = session.active_chat().unwrap().title.clone();
        assert_eq!(title, "Explain the retrieval pipeline...");
        assert_eq!(title.chars().count(), 33);

        session.send_message("Another question", &mut renderer).await.unwrap();
        assert_eq!(session.active_chat().unwrap().title, title);
    }

    #[tokio::test]
    async fn custom_title_is_kept_on_first_message() {
        let mut chat = Chat::new();
        chat.title = "Quarterly reports".to_string();
        let mut store = InMemoryStore::new();
        store.replace(vec![chat], None);
        let mut session = ChatSession::with_store(
            ScriptedBackend::default(),
            store,
            ChatConfig::default(),
        );
        let mut renderer = quiet();

        session
            .send_message("What changed since Q2?", &mut renderer)
            .await
            .unwrap();

        let chat = session.active_chat().unwrap();
        assert_eq!(chat.user_message_count(), 1);
        assert_eq!(chat.title, "Quarterly reports");
    }

    #[tokio::test]
    async fn backend_failure_becomes_assistant_message() {
        let backend = ScriptedBackend {
            fail_chat: true,
            ..Default::default()
        };
        let mut session = session(backend);
        let mut renderer = quiet();

        let reply = session
            .send_message("hello", &mut renderer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.role, MessageRole::Assistant);
        assert!(reply.content.starts_with(SEND_FAILURE_REPLY));
        assert!(reply.content.contains("Failed to send message"));
        assert!(!session.is_awaiting_reply());

        let stats = session.stats();
        assert_eq!(stats.requests, 1);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(stats.user_messages, 1);
        assert_eq!(stats.assistant_messages, 2);
    }

    #[tokio::test]
    async fn switch_by_number_and_id() {
        let mut session = session(ScriptedBackend::default());
        let older = session.active_chat().unwrap().id.clone();
        let newer = session.new_chat().id.clone();
        assert_eq!(session.chats()[0].id, newer);

        assert_eq!(session.switch_chat("2").unwrap().id, older);
        assert_eq!(session.switch_chat(&newer).unwrap().id, newer);
        assert!(session.switch_chat("3").unwrap_err().is_not_found());
        assert!(session.switch_chat("nope").unwrap_err().is_not_found());
        assert_eq!(session.active_chat().unwrap().id, newer);
    }

    #[tokio::test]
    async fn reply_goes_to_chat_it_was_sent_from() {
        let mut session = session(ScriptedBackend::default());
        let mut renderer = quiet();
        let first = session.active_chat().unwrap().id.clone();
        session.new_chat();
        session.select_chat(&first).unwrap();
        session.send_message("hi", &mut renderer).await.unwrap();
        assert_eq!(session.store().chat(&first).unwrap().messages.len(), 3);
        assert_eq!(session.chats()[0].messages.len(), 1);
    }

    #[tokio::test]
    async fn upload_batch_sends_summary() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("paper.pdf");
        let bad = dir.path().join("photo.png");
        std::fs::write(&good, b"%PDF-1.4").unwrap();
        std::fs::write(&bad, b"png").unwrap();

        let mut session = session(ScriptedBackend::default());
        let mut renderer = quiet();
        let outcome = session
            .upload_files(&[good, bad], &mut renderer)
            .await
            .unwrap();

        assert_eq!(outcome.succeeded.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(session.uploads().len(), 2);
        let requests = session.backend().requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message, "I've uploaded: paper.pdf");
        drop(requests);

        let stats = session.stats();
        assert_eq!(stats.documents_uploaded, 1);
        assert_eq!(stats.upload_failures, 1);
        assert_eq!(stats.requests, 2);
        assert_eq!(session.dashboard().total_documents, 1);
    }

    #[tokio::test]
    async fn rejected_batch_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("photo.png");
        std::fs::write(&bad, b"png").unwrap();
        let mut session = session(ScriptedBackend::default());
        let mut renderer = quiet();
        let outcome = session.upload_files(&[bad], &mut renderer).await.unwrap();
        assert!(outcome.succeeded.is_empty());
        assert!(session.backend().requests.lock().unwrap().is_empty());
        assert_eq!(session.clear_finished_uploads(), 1);
    }

    #[tokio::test]
    async fn drive_failure_is_counted() {
        let mut session = session(ScriptedBackend::default());
        assert!(session.import_from_drive("1AbC").await.is_err());
        assert!(session.import_from_drive("").await.unwrap_err().is_validation());
        let stats = session.stats();
        assert_eq!(stats.requests, 1);
        assert_eq!(stats.failed_requests, 1);
        assert!(session.health().await.unwrap().is_healthy());
    }

    #[test]
    fn settings_are_catalog_checked() {
        let mut session = session(ScriptedBackend::default());
        session.set_llm("gpt-4").unwrap();
        assert!(session.set_vector_db("redis").unwrap_err().is_validation());
        assert_eq!(session.settings().llm, "gpt-4");
        assert_eq!(session.settings().vector_db, "qdrant");
    }

    #[test]
    fn transcript_round_trip_keeps_active_chat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chats.json");
        let mut session = session(ScriptedBackend::default());
        session.new_chat();
        let active = session.active_chat().unwrap().id.clone();
        session.save_transcript(&path).unwrap();

        let mut restored = ChatSession::new(ScriptedBackend::default(), ChatConfig::default());
        restored.load_transcript(&path).unwrap();
        assert_eq!(restored.chats().len(), 2);
        assert_eq!(restored.active_chat().unwrap().id, active);
    }
}
