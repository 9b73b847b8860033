//! Form sessions: a [`FormController`] wired to persistence and uploads.
//!
//! Files are uploaded the moment they are attached; submit only sends the
//! URLs that are already stored. A failed upload marks its own slot and
//! nothing else. A failed submit leaves every edit in place for a retry.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use carehub_core::error::CoreError;
use carehub_core::forms::{FieldPath, FieldValue, FormController, FormMode};
use carehub_core::upload::LocalFileMeta;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::api::ApiClient;
use crate::error::ClientError;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Persistence for one kind of record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, payload: &Value) -> Result<Value, ClientError>;
    async fn update(&self, id: &str, payload: &Value) -> Result<Value, ClientError>;
}

/// Stores a file and returns its public URL.
#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload(&self, file: FileUpload) -> Result<String, ClientError>;
}

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = content_type_for(path);
        Ok(Self::new(name, content_type, bytes))
    }

    pub fn meta(&self) -> LocalFileMeta {
        LocalFileMeta {
            name: self.name.clone(),
            content_type: self.content_type.clone(),
        }
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// [`RecordStore`] over a REST collection path such as `medical-history`.
pub struct ResourceStore {
    api: Arc<ApiClient>,
    path: String,
}

impl ResourceStore {
    pub fn new(api: Arc<ApiClient>, path: impl Into<String>) -> Self {
        Self {
            api,
            path: path.into(),
        }
    }
}

#[async_trait]
impl RecordStore for ResourceStore {
    async fn create(&self, payload: &Value) -> Result<Value, ClientError> {
        self.api.create(&self.path, payload).await
    }

    async fn update(&self, id: &str, payload: &Value) -> Result<Value, ClientError> {
        self.api.update(&self.path, id, payload).await
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Result of [`FormSession::attach_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { url: String },
    Failed { message: String },
    /// The row was removed or another file was picked meanwhile.
    Superseded,
}

struct FormState {
    controller: FormController,
    submitting: bool,
    closed: bool,
    submit_error: Option<String>,
}

/// An open form: edits, uploads and submission for one record.
///
/// Share as `Arc<FormSession>` so uploads can run while editing goes on.
pub struct FormSession {
    state: Mutex<FormState>,
    store: Arc<dyn RecordStore>,
    uploader: Arc<dyn FileUploader>,
}

impl FormSession {
    pub fn new(
        controller: FormController,
        store: Arc<dyn RecordStore>,
        uploader: Arc<dyn FileUploader>,
    ) -> Self {
        Self {
            state: Mutex::new(FormState {
                controller,
                submitting: false,
                closed: false,
                submit_error: None,
            }),
            store,
            uploader,
        }
    }

    // ---- editing ----

    pub async fn set_field(
        &self,
        path: FieldPath<'_>,
        value: impl Into<FieldValue>,
    ) -> Result<(), CoreError> {
        self.state.lock().await.controller.set_field(path, value)
    }

    pub async fn add_list_item(&self, list: &str) -> Result<usize, CoreError> {
        self.state.lock().await.controller.add_list_item(list)
    }

    pub async fn remove_list_item(&self, list: &str, index: usize) -> Result<(), CoreError> {
        self.state.lock().await.controller.remove_list_item(list, index)
    }

    /// Read from the current form state.
    pub async fn read<R>(&self, f: impl FnOnce(&FormController) -> R) -> R {
        f(&self.state.lock().await.controller)
    }

    // ---- uploads ----

    /// Upload `file` into the attachment row at `index` right away.
    ///
    /// Only addressing errors are returned as `Err`; an upload failure is
    /// recorded on the slot and reported as [`UploadOutcome::Failed`].
    pub async fn attach_file(
        &self,
        list: &str,
        index: usize,
        file: FileUpload,
    ) -> Result<UploadOutcome, ClientError> {
        let ticket = {
            let mut state = self.state.lock().await;
            state.controller.begin_upload(list, index, file.meta())?
        };

        let name = file.name.clone();
        let result = self.uploader.upload(file).await;

        let mut state = self.state.lock().await;
        let outcome = match result {
            Ok(url) => {
                if state.controller.finish_upload(&ticket, &url) {
                    tracing::info!(list, row = ticket.row, file = %name, "Attachment uploaded");
                    UploadOutcome::Uploaded { url }
                } else {
                    UploadOutcome::Superseded
                }
            }
            Err(e) => {
                let message = e.user_message();
                if state.controller.fail_upload(&ticket, &message) {
                    tracing::warn!(list, row = ticket.row, file = %name, error = %e, "Attachment upload failed");
                    UploadOutcome::Failed { message }
                } else {
                    UploadOutcome::Superseded
                }
            }
        };
        if outcome == UploadOutcome::Superseded {
            tracing::debug!(list, row = ticket.row, "Dropping superseded upload result");
        }
        Ok(outcome)
    }

    // ---- submission ----

    /// Create or update the record.
    ///
    /// Refused while an upload is in flight or required fields are empty.
    /// On success the session closes and the saved record is returned. On
    /// failure the message is kept in [`submit_error`](Self::submit_error)
    /// and all edits stay in place.
    pub async fn submit(&self) -> Result<Value, ClientError> {
        let (schema, mode, payload) = {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(CoreError::Validation("This form has already been saved".into()).into());
            }
            if state.submitting {
                return Err(CoreError::Validation("Save already in progress".into()).into());
            }
            if let Some((list, index)) = state.controller.upload_in_flight() {
                let err = ClientError::from(CoreError::UploadInFlight {
                    list: list.to_string(),
                    index,
                });
                state.submit_error = Some(err.user_message());
                return Err(err);
            }
            if let Err(e) = state.controller.validate_required() {
                let err = ClientError::from(e);
                state.submit_error = Some(err.user_message());
                return Err(err);
            }
            state.submitting = true;
            state.submit_error = None;
            (
                state.controller.schema().name,
                state.controller.mode().clone(),
                state.controller.to_wire(),
            )
        };

        let result = match &mode {
            FormMode::Create => self.store.create(&payload).await,
            FormMode::Edit { id } => self.store.update(id, &payload).await,
        };

        let mut state = self.state.lock().await;
        state.submitting = false;
        match result {
            Ok(saved) => {
                tracing::info!(form = schema, ?mode, "Form saved");
                state.closed = true;
                Ok(saved)
            }
            Err(e) => {
                tracing::warn!(form = schema, ?mode, error = %e, "Form save failed");
                state.submit_error = Some(e.user_message());
                Err(e)
            }
        }
    }

    pub async fn submit_error(&self) -> Option<String> {
        self.state.lock().await.submit_error.clone()
    }

    pub async fn is_submitting(&self) -> bool {
        self.state.lock().await.submitting
    }

    /// Whether a submit succeeded. A closed form is not submitted again.
    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}
