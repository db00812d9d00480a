use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a file stands in the upload pipeline.
///
/// Transitions are monotone: `Uploading` moves to exactly one of `Success` or
/// `Error`, and terminal states never change again.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Accepted by validation and waiting for or in transfer.
    Uploading,

    /// The backend accepted the file.
    Success,

    /// Validation or transfer failed.
    Error,
}

impl UploadStatus {
    /// Returns true for `Success` and `Error`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UploadStatus::Uploading)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadStatus::Uploading => write!(f, "uploading"),
            UploadStatus::Success => write!(f, "success"),
            UploadStatus::Error => write!(f, "error"),
        }
    }
}

/// Client-side bookkeeping for one selected file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadedFile {
    /// Identifier used to address the entry (e.g. for dismissal).
    pub id: String,

    /// Location of the original file.
    pub path: PathBuf,

    /// File name as shown to the user and sent to the backend.
    pub name: String,

    /// Size of the file in bytes.
    pub size: u64,

    /// Transfer progress, 0 to 100.
    pub progress: u8,

    /// Current status.
    pub status: UploadStatus,

    /// Why the file failed, when `status` is `Error`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl UploadedFile {
    /// An entry that passed validation and is about to be transferred.
    pub fn pending(path: impl Into<PathBuf>, name: impl Into<String>, size: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            path: path.into(),
            name: name.into(),
            size,
            progress: 0,
            status: UploadStatus::Uploading,
            error: None,
        }
    }

    /// An entry that failed validation.  It never enters `Uploading`.
    pub fn rejected(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        size: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status: UploadStatus::Error,
            error: Some(error.into()),
            ..Self::pending(path, name, size)
        }
    }

    /// Record transfer progress.  Ignored once terminal; never moves backwards.
    ///
    /// Streamed progress stops at 99; only [`mark_success`](Self::mark_success)
    /// reaches 100.
    pub fn record_progress(&mut self, sent: u64, total: u64) {
        if self.status.is_terminal() {
            return;
        }
        let percent = if total == 0 {
            99
        } else {
            (sent.min(total).saturating_mul(100) / total).min(99) as u8
        };
        self.progress = self.progress.max(percent);
    }

    /// Move to `Success`.  Returns false if the entry was already terminal.
    pub fn mark_success(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = UploadStatus::Success;
        self.progress = 100;
        true
    }

    /// Move to `Error`.  Returns false if the entry was already terminal.
    pub fn mark_error(&mut self, error: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = UploadStatus::Error;
        self.error = Some(error.into());
        true
    }

    /// Human-readable size, e.g. `1.5 MB`.
    pub fn display_size(&self) -> String {
        format_file_size(self.size)
    }
}

/// Format a byte count with base-1024 units and at most two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}
