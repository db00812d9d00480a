//! Document upload batching.
//!
//! A batch validates every selected file up front.  Files that fail
//! validation are recorded as errors and never transferred; the rest are sent
//! to the backend one after another.  A transfer failure only affects its own
//! file.  When every file of the batch is terminal, observers are told once
//! which files succeeded.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::client::{RagBackend, TransferProgress};
use crate::error::{Error, Result};
use crate::observability::{UPLOAD_FAILURES, UPLOAD_FILES, UPLOAD_REJECTED};
use crate::types::{UploadResponse, UploadStatus, UploadedFile};

/// Default size limit in megabytes.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;

/// Default accepted extensions.
pub const DEFAULT_ACCEPTED_TYPES: &[&str] = &[".pdf", ".txt", ".docx", ".doc"];

/// Which files may be uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPolicy {
    /// Largest accepted file, in megabytes (1 MB = 1024 * 1024 bytes).
    pub max_file_size_mb: u64,

    /// Accepted extensions, lower-case with a leading dot.
    pub accepted_types: Vec<String>,
}

impl UploadPolicy {
    /// Create a policy; extensions are normalized to `.ext` lower-case.
    pub fn new<S: AsRef<str>>(max_file_size_mb: u64, accepted_types: &[S]) -> Self {
        Self {
            max_file_size_mb,
            accepted_types: accepted_types
                .iter()
                .map(|t| normalize_extension(t.as_ref()))
                .filter(|t| t.len() > 1)
                .collect(),
        }
    }

    /// The size limit in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// Check a file by name and size, returning the message to show on failure.
    pub fn validate(&self, name: &str, size: u64) -> std::result::Result<(), String> {
        if size > self.max_file_size_bytes() {
            return Err(format!(
                "File size exceeds {}MB limit",
                self.max_file_size_mb
            ));
        }
        let extension = extension_of(name);
        if !self
            .accepted_types
            .iter()
            .any(|t| Some(t) == extension.as_ref())
        {
            return Err(format!(
                "File type not supported. Accepted types: {}",
                self.accepted_types.join(", ")
            ));
        }
        Ok(())
    }

    /// One-line summary, e.g. `Supported formats: .pdf, .txt (Max 10MB)`.
    pub fn describe(&self) -> String {
        format!(
            "Supported formats: {} (Max {}MB)",
            self.accepted_types.join(", "),
            self.max_file_size_mb
        )
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_ACCEPTED_TYPES)
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

/// `.` followed by the text after the last dot, lower-cased.  `None` when
/// the name has no dot.
fn extension_of(name: &str) -> Option<String> {
    let (_, last) = name.rsplit_once('.')?;
    Some(format!(".{}", last.to_lowercase()))
}

/// Receives upload events as a batch runs.
pub trait UploadObserver {
    /// A file was added to the queue (already validated).
    fn file_added(&mut self, file: &UploadedFile) {
        _ = file;
    }

    /// A file's progress percentage changed.
    fn progress(&mut self, file: &UploadedFile) {
        _ = file;
    }

    /// A file reached a terminal status.
    fn file_finished(&mut self, file: &UploadedFile) {
        _ = file;
    }

    /// Every file of the batch is terminal and at least one succeeded.
    fn batch_complete(&mut self, succeeded: &[UploadedFile]) {
        _ = succeeded;
    }
}

impl UploadObserver for () {}

/// The uploader's list of files, across batches, until dismissed.
#[derive(Debug, Default, Clone)]
pub struct UploadQueue {
    files: Vec<UploadedFile>,
}

impl UploadQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its id.
    pub fn add(&mut self, file: UploadedFile) -> String {
        let id = file.id.clone();
        self.files.push(file);
        id
    }

    /// All entries in selection order.
    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    /// Look up an entry.
    pub fn get(&self, id: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut UploadedFile> {
        self.files.iter_mut().find(|f| f.id == id)
    }

    /// Remove an entry at the user's request.
    pub fn dismiss(&mut self, id: &str) -> Result<UploadedFile> {
        let index = self
            .files
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| Error::not_found("no such uploaded file", Some(id.to_string())))?;
        Ok(self.files.remove(index))
    }

    /// Remove every terminal entry; returns how many were removed.
    pub fn clear_finished(&mut self) -> usize {
        let before = self.files.len();
        self.files.retain(|f| !f.status.is_terminal());
        before - self.files.len()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of entries that uploaded successfully.
    pub fn succeeded_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == UploadStatus::Success)
            .count()
    }
}

/// Result of one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    /// Files that reached `Success`.
    pub succeeded: Vec<UploadedFile>,
    /// Files that reached `Error`, by validation or transfer.
    pub failed: Vec<UploadedFile>,
    /// Files that were sent to the backend, successfully or not.
    pub transferred: usize,
}

impl BatchOutcome {
    /// Names of the succeeded files, joined for display.
    pub fn succeeded_names(&self) -> String {
        self.succeeded
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The chat message announcing the batch, if anything succeeded.
    pub fn summary_message(&self) -> Option<String> {
        if self.succeeded.is_empty() {
            None
        } else {
            Some(format!("I've uploaded: {}", self.succeeded_names()))
        }
    }

    /// True if every file succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs upload batches under a policy for one backend session.
#[derive(Debug, Clone)]
pub struct UploadBatcher {
    policy: UploadPolicy,
    session_id: String,
}

impl UploadBatcher {
    /// Create a batcher.
    pub fn new(policy: UploadPolicy, session_id: impl Into<String>) -> Self {
        Self {
            policy,
            session_id: session_id.into(),
        }
    }

    /// The active policy.
    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Build a queue entry for `path`, validated against the policy.
    pub async fn select(&self, path: &Path) -> UploadedFile {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => return UploadedFile::rejected(path, name, 0, "Not a regular file"),
            Err(err) => {
                return UploadedFile::rejected(path, name, 0, format!("Cannot read file: {err}"));
            }
        };
        match self.policy.validate(&name, size) {
            Ok(()) => UploadedFile::pending(path, name, size),
            Err(reason) => UploadedFile::rejected(path, name, size, reason),
        }
    }

    /// Validate and upload `paths`, recording every file in `queue`.
    pub async fn run<B: RagBackend + ?Sized, O: UploadObserver + ?Sized>(
        &self,
        backend: &B,
        queue: &mut UploadQueue,
        paths: &[PathBuf],
        observer: &mut O,
    ) -> BatchOutcome {
        let mut batch = Vec::with_capacity(paths.len());
        for path in paths {
            let file = self.select(path).await;
            if file.status == UploadStatus::Error {
                UPLOAD_REJECTED.click();
                tracing::info!(file = %file.name, reason = ?file.error, "file rejected");
            }
            observer.file_added(&file);
            batch.push(queue.add(file));
        }

        let mut transferred = 0;
        for id in &batch {
            let Some(file) = queue.get(id) else {
                continue;
            };
            if file.status != UploadStatus::Uploading {
                observer.file_finished(file);
                continue;
            }
            let (path, name) = (file.path.clone(), file.name.clone());
            transferred += 1;
            let result = self.transfer(backend, queue, id, &path, &name, observer).await;
            if let Some(file) = queue.get_mut(id) {
                match result {
                    Ok(response) => {
                        tracing::debug!(file = %name, status = %response.status, "upload accepted");
                        file.mark_success();
                    }
                    Err(err) => {
                        UPLOAD_FAILURES.click();
                        tracing::warn!(file = %name, error = %err, "upload failed");
                        file.mark_error(err.to_string());
                    }
                }
                observer.file_finished(file);
            }
        }

        let mut outcome = BatchOutcome {
            transferred,
            ..Default::default()
        };
        for id in &batch {
            if let Some(file) = queue.get(id) {
                match file.status {
                    UploadStatus::Success => outcome.succeeded.push(file.clone()),
                    _ => outcome.failed.push(file.clone()),
                }
            }
        }
        if !outcome.succeeded.is_empty() {
            observer.batch_complete(&outcome.succeeded);
        }
        outcome
    }

    async fn transfer<B: RagBackend + ?Sized, O: UploadObserver + ?Sized>(
        &self,
        backend: &B,
        queue: &mut UploadQueue,
        id: &str,
        path: &Path,
        name: &str,
        observer: &mut O,
    ) -> Result<UploadResponse> {
        UPLOAD_FILES.click();
        let (tx, mut rx) = mpsc::unbounded_channel::<TransferProgress>();
        let request = backend.upload_file(path, name, &self.session_id, Some(tx));
        tokio::pin!(request);
        loop {
            // Drain pending progress before checking for completion.
            tokio::select! {
                biased;
                Some(update) = rx.recv() => {
                    if let Some(file) = queue.get_mut(id) {
                        let before = file.progress;
                        file.record_progress(update.sent, update.total);
                        if file.progress != before {
                            observer.progress(file);
                        }
                    }
                }
                result = &mut request => return result,
            }
        }
    }

    /// Ask the backend to ingest a file straight from Google Drive.
    pub async fn import_from_drive<B: RagBackend + ?Sized>(
        &self,
        backend: &B,
        file_id: &str,
    ) -> Result<UploadResponse> {
        let file_id = file_id.trim();
        if file_id.is_empty() {
            return Err(Error::validation(
                "a Google Drive file id is required",
                Some("file_id".to_string()),
            ));
        }
        backend.upload_from_google_drive(file_id).await
    }
}
