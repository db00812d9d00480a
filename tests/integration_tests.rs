//! Integration tests for the shapeshifter library.
//! These tests run the HTTP client against an in-process backend stub.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Multipart, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use shapeshifter::chat::{ChatConfig, ChatSession, SEND_FAILURE_REPLY};
    use shapeshifter::{
        ChatRequest, PlainTextRenderer, RagBackend, RagClient, UploadBatcher, UploadPolicy,
        UploadQueue, UploadStatus,
    };

    /// One multipart upload as the stub saw it.
    #[derive(Debug, Clone)]
    struct ReceivedUpload {
        file_name: String,
        session_id: String,
        bytes: usize,
    }

    #[derive(Default)]
    struct Recorded {
        chats: Vec<Value>,
        uploads: Vec<ReceivedUpload>,
        drive_ids: Vec<String>,
    }

    type Shared = Arc<Mutex<Recorded>>;

    async fn chat(State(state): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        state.lock().unwrap().chats.push(body.clone());
        if body["message"] == "boom" {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "model crashed"})),
            );
        }
        (
            StatusCode::OK,
            Json(json!({
                "response": format!("You asked: {}", body["message"].as_str().unwrap_or_default()),
                "citations": [
                    {"source": "document_1.pdf", "chunk": "Page 5, Section 2.1"},
                    {"source": "document_2.pdf", "chunk": "Page 12, Section 4.3"}
                ]
            })),
        )
    }

    async fn upload(
        State(state): State<Shared>,
        mut multipart: Multipart,
    ) -> (StatusCode, Json<Value>) {
        let mut received = ReceivedUpload {
            file_name: String::new(),
            session_id: String::new(),
            bytes: 0,
        };
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    received.file_name = field.file_name().unwrap_or_default().to_string();
                    received.bytes = field.bytes().await.unwrap().len();
                }
                "session_id" => received.session_id = field.text().await.unwrap(),
                _ => {}
            }
        }
        let name = received.file_name.clone();
        state.lock().unwrap().uploads.push(received);
        if name.starts_with("reject") {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"detail": "could not parse document"})),
            );
        }
        (
            StatusCode::OK,
            Json(json!({"filename": name, "status": "success", "message": "File processed"})),
        )
    }

    async fn drive(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
        let file_id = body["file_id"].as_str().unwrap_or_default().to_string();
        state.lock().unwrap().drive_ids.push(file_id.clone());
        Json(json!({"filename": format!("{file_id}.pdf"), "status": "success", "message": "Imported"}))
    }

    async fn health() -> Json<Value> {
        Json(json!({"status": "healthy"}))
    }

    async fn spawn_backend() -> (String, Shared) {
        let state = Shared::default();
        let app = Router::new()
            .route("/chat", post(chat))
            .route("/upload", post(upload))
            .route("/upload/google-drive", post(drive))
            .route("/health", get(health))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), state)
    }

    fn quiet() -> PlainTextRenderer {
        PlainTextRenderer::with_writer(Box::new(std::io::sink()), false)
    }

    fn write_file(dir: &std::path::Path, name: &str, size: usize) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, vec![b'a'; size]).unwrap();
        path
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let (url, state) = spawn_backend().await;
        let client = RagClient::new(Some(url)).unwrap();

        let response = client
            .send_message(&ChatRequest::new("What documents are available?", "s-1"))
            .await
            .unwrap();
        assert_eq!(response.response, "You asked: What documents are available?");
        assert_eq!(response.citations.unwrap().len(), 2);

        let recorded = state.lock().unwrap();
        assert_eq!(recorded.chats[0]["session_id"], "s-1");
        assert!(recorded.chats[0].get("settings").is_none());
    }

    #[tokio::test]
    async fn test_non_2xx_is_generic_failure() {
        let (url, _) = spawn_backend().await;
        let client = RagClient::new(Some(url)).unwrap();
        let err = client
            .send_message(&ChatRequest::new("boom", "s-1"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert!(err.to_string().contains("Failed to send message"));
    }

    #[tokio::test]
    async fn test_health_and_drive() {
        let (url, state) = spawn_backend().await;
        let client = RagClient::new(Some(url)).unwrap();
        assert!(client.health().await.unwrap().is_healthy());

        let response = client.upload_from_google_drive("1AbCdEf").await.unwrap();
        assert_eq!(response.filename, "1AbCdEf.pdf");
        assert_eq!(state.lock().unwrap().drive_ids, vec!["1AbCdEf"]);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = RagClient::new(Some(format!("http://{addr}"))).unwrap();
        let err = client.health().await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_upload_batch_against_backend() {
        let (url, state) = spawn_backend().await;
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write_file(dir.path(), "report.pdf", 200_000),
            write_file(dir.path(), "rejected.txt", 10),
            write_file(dir.path(), "diagram.png", 10),
        ];
        let client = RagClient::new(Some(url)).unwrap();
        let batcher = UploadBatcher::new(UploadPolicy::default(), "s-2");
        let mut queue = UploadQueue::new();

        let outcome = batcher.run(&client, &mut queue, &paths, &mut ()).await;

        assert_eq!(outcome.succeeded.len(), 1);
        assert_eq!(outcome.failed.len(), 2);
        assert_eq!(outcome.transferred, 2);
        let report = &queue.files()[0];
        assert_eq!(report.status, UploadStatus::Success);
        assert_eq!(report.progress, 100);
        let rejected = &queue.files()[1];
        assert_eq!(rejected.status, UploadStatus::Error);
        assert!(rejected.error.as_deref().unwrap().contains("Failed to upload file"));

        let recorded = state.lock().unwrap();
        assert_eq!(recorded.uploads.len(), 2);
        assert_eq!(recorded.uploads[0].file_name, "report.pdf");
        assert_eq!(recorded.uploads[0].session_id, "s-2");
        assert_eq!(recorded.uploads[0].bytes, 200_000);
    }

    #[tokio::test]
    async fn test_session_against_backend() {
        let (url, state) = spawn_backend().await;
        let client = RagClient::new(Some(url)).unwrap();
        let mut session = ChatSession::new(client, ChatConfig::default());
        let mut renderer = quiet();

        session.set_vector_db("pgvector").unwrap();
        let reply = session
            .send_message("What documents are available?", &mut renderer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.citations().len(), 2);

        let failed = session
            .send_message("boom", &mut renderer)
            .await
            .unwrap()
            .unwrap();
        assert!(failed.content.starts_with(SEND_FAILURE_REPLY));

        let chat = session.active_chat().unwrap();
        assert_eq!(chat.messages.len(), 5);
        assert_eq!(chat.title, "What documents are available?");

        let recorded = state.lock().unwrap();
        assert_eq!(recorded.chats[0]["settings"]["vectorDb"], "pgvector");
        assert_eq!(recorded.chats[0]["settings"]["llm"], "gemma-27b");
        assert_eq!(recorded.chats[0]["session_id"], "default");
    }
}
