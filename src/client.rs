use std::env;
use std::path::Path;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::stream::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client as ReqwestClient, Response};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::io::ReaderStream;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, UPLOAD_BYTES,
};
use crate::types::{
    ChatRequest, ChatResponse, GoogleDriveUploadRequest, HealthResponse, UploadResponse,
};

/// Backend used when neither the environment nor the configuration names one.
pub const DEFAULT_API_URL: &str = "http://localhost:8001";
/// Environment variable that overrides [`DEFAULT_API_URL`].
pub const API_URL_ENV: &str = "SHAPESHIFTER_API_URL";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Bytes handed to the transport so far for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Bytes sent.
    pub sent: u64,
    /// Total size of the file.
    pub total: u64,
}

/// Channel on which upload progress is reported.
pub type ProgressSender = UnboundedSender<TransferProgress>;

/// The four calls the assistant backend offers.
///
/// [`RagClient`] is the HTTP implementation; chat sessions and upload batches
/// are generic over this trait so they can run against any backend.
#[async_trait::async_trait]
pub trait RagBackend: Send + Sync {
    /// `POST /chat`.
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// `POST /upload` as a multipart form with fields `file` and `session_id`.
    ///
    /// Progress is reported on `progress` while the body is streamed.
    async fn upload_file(
        &self,
        path: &Path,
        file_name: &str,
        session_id: &str,
        progress: Option<ProgressSender>,
    ) -> Result<UploadResponse>;

    /// `POST /upload/google-drive`.
    async fn upload_from_google_drive(&self, file_id: &str) -> Result<UploadResponse>;

    /// `GET /health`.
    async fn health(&self) -> Result<HealthResponse>;
}

/// HTTP client for the assistant backend.
///
/// ```no_run
/// # use shapeshifter::{ChatRequest, RagBackend, RagClient};
/// # tokio_test::block_on(async {
/// let client = RagClient::new(Some("http://localhost:8001".to_string()))?;
/// let reply = client
///     .send_message(&ChatRequest::new("What documents are available?", "default"))
///     .await?;
/// println!("{}", reply.response);
/// # Ok::<(), shapeshifter::Error>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct RagClient {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl RagClient {
    /// Create a new client.
    ///
    /// The base URL can be provided directly or read from the
    /// `SHAPESHIFTER_API_URL` environment variable; otherwise
    /// `http://localhost:8001` is used.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = base_url
            .or_else(|| env::var(API_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let base_url = normalize_base_url(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The backend this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Turn a response into `T`, or into the operation's generic failure.
    async fn finish<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        response: Response,
        failure: &str,
        started: Instant,
    ) -> Result<T> {
        CLIENT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());
        let status = response.status();
        if !status.is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let body = response.text().await.ok().filter(|b| !b.is_empty());
            tracing::warn!(endpoint, status = status.as_u16(), "backend returned an error");
            return Err(Error::api(status.as_u16(), failure, body));
        }
        response.json::<T>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }
}

#[async_trait::async_trait]
impl RagBackend for RagClient {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = self.endpoint("chat")?;
        tracing::debug!(%url, session_id = %request.session_id, "sending chat message");
        CLIENT_REQUESTS.click();
        let started = Instant::now();
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.finish("chat", response, "Failed to send message", started)
            .await
    }

    async fn upload_file(
        &self,
        path: &Path,
        file_name: &str,
        session_id: &str,
        progress: Option<ProgressSender>,
    ) -> Result<UploadResponse> {
        let url = self.endpoint("upload")?;
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|err| Error::io(format!("failed to open {}", path.display()), err))?;
        let total = file
            .metadata()
            .await
            .map_err(|err| Error::io(format!("failed to stat {}", path.display()), err))?
            .len();

        let mut sent = 0u64;
        let chunks = ReaderStream::new(file).map(move |chunk: std::io::Result<Bytes>| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                UPLOAD_BYTES.count(bytes.len() as u64);
                if let Some(progress) = &progress {
                    // The receiver may already be gone; progress is advisory.
                    let _ = progress.send(TransferProgress { sent, total });
                }
            }
            chunk
        });
        let part = Part::stream_with_length(Body::wrap_stream(chunks), total)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| self.transport_error(e))?;
        let form = Form::new()
            .part("file", part)
            .text("session_id", session_id.to_string());

        tracing::debug!(%url, file_name, total, "uploading file");
        CLIENT_REQUESTS.click();
        let started = Instant::now();
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.finish("upload", response, "Failed to upload file", started)
            .await
    }

    async fn upload_from_google_drive(&self, file_id: &str) -> Result<UploadResponse> {
        let url = self.endpoint("upload/google-drive")?;
        tracing::debug!(%url, file_id, "importing from google drive");
        CLIENT_REQUESTS.click();
        let started = Instant::now();
        let response = self
            .client
            .post(url)
            .json(&GoogleDriveUploadRequest::new(file_id))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.finish(
            "upload/google-drive",
            response,
            "Failed to upload from Google Drive",
            started,
        )
        .await
    }

    async fn health(&self) -> Result<HealthResponse> {
        let url = self.endpoint("health")?;
        CLIENT_REQUESTS.click();
        let started = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.finish("health", response, "Backend is unhealthy", started)
            .await
    }
}

/// Parse a base URL and make sure relative joins keep its path.
fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = RagClient::new(Some("http://backend.test:9000".to_string())).unwrap();
        assert_eq!(client.base_url().as_str(), "http://backend.test:9000/");
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);

        let client = RagClient::with_options(
            Some("http://backend.test/api".to_string()),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(5));
        assert_eq!(
            client.endpoint("upload/google-drive").unwrap().as_str(),
            "http://backend.test/api/upload/google-drive"
        );
    }

    #[test]
    fn invalid_base_url() {
        let err = RagClient::new(Some("not a url".to_string())).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn endpoints_join_under_root() {
        let client = RagClient::new(Some(DEFAULT_API_URL.to_string())).unwrap();
        assert_eq!(
            client.endpoint("chat").unwrap().as_str(),
            "http://localhost:8001/chat"
        );
        assert_eq!(
            client.endpoint("health").unwrap().as_str(),
            "http://localhost:8001/health"
        );
    }
}
