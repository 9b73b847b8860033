//! Per-file upload slot lifecycle.
//!
//! ```text
//! empty --select_file--> uploading --complete--> uploaded
//!                            |
//!                            +------fail-------> failed (error set)
//! ```
//!
//! Selecting another file while an upload is in flight starts a new
//! attempt; the outcome of the older attempt is then ignored.

use serde::{Deserialize, Serialize};

/// Name and MIME type of the file the user picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFileMeta {
    pub name: String,
    pub content_type: String,
}

/// Identifies one upload attempt on a slot.
pub type UploadAttempt = u64;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSlot {
    pub title: String,
    pub file_url: Option<String>,
    pub local_file: Option<LocalFileMeta>,
    pub error: Option<String>,
    pub is_uploading: bool,
    pub(crate) attempt: UploadAttempt,
}

impl UploadSlot {
    /// A slot that already points at an uploaded file (edit mode).
    pub fn uploaded(title: impl Into<String>, file_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            file_url: Some(file_url.into()),
            ..Self::default()
        }
    }

    /// Start a new upload attempt for `file`.
    ///
    /// The previous URL stays in place until the new upload succeeds.
    pub fn select_file(&mut self, file: LocalFileMeta) -> UploadAttempt {
        self.attempt += 1;
        self.local_file = Some(file);
        self.error = None;
        self.is_uploading = true;
        self.attempt
    }

    /// Record a successful upload. Returns `false` if `attempt` is stale.
    pub fn complete(&mut self, attempt: UploadAttempt, url: impl Into<String>) -> bool {
        if !self.is_current(attempt) {
            return false;
        }
        self.file_url = Some(url.into());
        self.error = None;
        self.is_uploading = false;
        true
    }

    /// Record a failed upload. Returns `false` if `attempt` is stale.
    pub fn fail(&mut self, attempt: UploadAttempt, message: impl Into<String>) -> bool {
        if !self.is_current(attempt) {
            return false;
        }
        self.error = Some(message.into());
        self.is_uploading = false;
        true
    }

    pub fn is_uploaded(&self) -> bool {
        self.file_url.is_some()
    }

    fn is_current(&self, attempt: UploadAttempt) -> bool {
        self.is_uploading && attempt == self.attempt
    }
}
