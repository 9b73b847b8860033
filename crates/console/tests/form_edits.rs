//! Tests for applying command-line edits to a form session.

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

use carehub_client::error::ClientError;
use carehub_client::form::{FileUpload, FileUploader, FormSession, RecordStore};
use carehub_console::edit::{self, FormEdits, FormKind};
use carehub_core::error::CoreError;
use carehub_core::forms::FormController;

#[derive(Default)]
struct Saved(Mutex<Vec<Value>>);

#[async_trait]
impl RecordStore for Saved {
    async fn create(&self, payload: &Value) -> Result<Value, ClientError> {
        self.0.lock().unwrap().push(payload.clone());
        Ok(payload.clone())
    }

    async fn update(&self, _id: &str, payload: &Value) -> Result<Value, ClientError> {
        self.create(payload).await
    }
}

/// Rejects empty files; stores the rest under a fixed host.
struct Cdn;

#[async_trait]
impl FileUploader for Cdn {
    async fn upload(&self, file: FileUpload) -> Result<String, ClientError> {
        if file.bytes.is_empty() {
            return Err(ClientError::Server {
                status: 400,
                message: "Empty file".into(),
            });
        }
        Ok(format!("https://cdn.carehub.test/{}", file.name))
    }
}

fn infirmary_form(store: Arc<Saved>) -> Arc<FormSession> {
    let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
    let form = FormController::new_record(FormKind::Infirmary.schema(), today);
    Arc::new(FormSession::new(form, store, Arc::new(Cdn)))
}

// ---------------------------------------------------------------------------
// Test: add, set and attach produce the expected payload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn edits_build_the_submitted_payload() {
    let dir = tempfile::tempdir().unwrap();
    let note = dir.path().join("note.pdf");
    let empty = dir.path().join("empty.pdf");
    std::fs::write(&note, b"%PDF-1.7").unwrap();
    std::fs::write(&empty, b"").unwrap();

    let store = Arc::new(Saved::default());
    let form = infirmary_form(store.clone());
    let edits = FormEdits {
        add: vec!["attachments".into(), "attachments".into()],
        set: vec![
            "studentName=Riya Shah".into(),
            "className=6B".into(),
            "complaint=Headache".into(),
            "visitDate=2024-06-14".into(),
            "parentNotified=yes".into(),
            "treatments[0].medicine=Paracetamol".into(),
            "attachments[0].title=Doctor note".into(),
        ],
        attach: vec![
            format!("attachments[0]={}", note.display()),
            format!("attachments[1]={}", empty.display()),
        ],
    };

    let failures = edit::apply(&form, &edits).await.unwrap();
    assert_eq!(failures, vec![("attachments[1]".to_string(), "Empty file".to_string())]);

    let saved = form.submit().await.unwrap();
    assert_eq!(saved["studentName"], "Riya Shah");
    assert_eq!(saved["visitDate"], "2024-06-14T00:00:00.000Z");
    assert_eq!(saved["parentNotified"], true);
    assert_eq!(saved["treatmentGiven"][0]["medicineName"], "Paracetamol");
    assert_eq!(
        saved["documents"],
        json!([{ "title": "Doctor note", "fileUrl": "https://cdn.carehub.test/note.pdf" }])
    );
    assert_eq!(store.0.lock().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: the first bad edit stops the run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_edits_are_reported() {
    let form = infirmary_form(Arc::new(Saved::default()));

    let unknown_list = FormEdits {
        add: vec!["prescriptions".into()],
        ..FormEdits::default()
    };
    assert_matches!(
        edit::apply(&form, &unknown_list).await,
        Err(ClientError::Core(CoreError::UnknownField { .. }))
    );

    let missing_row = FormEdits {
        set: vec!["treatments[3].dosage=5ml".into()],
        ..FormEdits::default()
    };
    assert_matches!(
        edit::apply(&form, &missing_row).await,
        Err(ClientError::Core(CoreError::IndexOutOfRange { index: 3, .. }))
    );

    let missing_file = FormEdits {
        add: vec!["attachments".into()],
        attach: vec!["attachments[0]=/nonexistent/scan.pdf".into()],
        ..FormEdits::default()
    };
    assert_matches!(
        edit::apply(&form, &missing_file).await,
        Err(ClientError::Core(CoreError::Validation(m))) if m.contains("Cannot read")
    );
}
