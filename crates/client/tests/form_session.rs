//! Tests for `FormSession`: immediate uploads, submit gating, failure
//! retention and the edit-free round trip.

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tokio::sync::Notify;

use carehub_client::error::ClientError;
use carehub_client::form::{FileUpload, FileUploader, FormSession, RecordStore, UploadOutcome};
use carehub_core::error::CoreError;
use carehub_core::forms::medical_history::{
    MEDICAL_HISTORY, PRIMARY_CARE_PHYSICIAN, REPORTS, TREATING_DOCTORS,
};
use carehub_core::forms::{FieldPath, FieldValue, FormController};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create(Value),
    Update(String, Value),
}

/// Records calls; fails once with `fail_once` when set.
#[derive(Default)]
struct FakeStore {
    calls: Mutex<Vec<Call>>,
    fail_once: Mutex<Option<String>>,
}

impl FakeStore {
    fn failing_once(message: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_once: Mutex::new(Some(message.to_string())),
            ..Self::default()
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn outcome(&self, mut payload: Value, id: &str) -> Result<Value, ClientError> {
        if let Some(message) = self.fail_once.lock().unwrap().take() {
            return Err(ClientError::Server {
                status: 404,
                message,
            });
        }
        payload["_id"] = json!(id);
        Ok(payload)
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn create(&self, payload: &Value) -> Result<Value, ClientError> {
        self.calls.lock().unwrap().push(Call::Create(payload.clone()));
        self.outcome(payload.clone(), "MH-NEW")
    }

    async fn update(&self, id: &str, payload: &Value) -> Result<Value, ClientError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Update(id.to_string(), payload.clone()));
        self.outcome(payload.clone(), id)
    }
}

/// Files whose name starts with `bad` fail; the rest get a CDN URL.
struct FakeUploader;

#[async_trait]
impl FileUploader for FakeUploader {
    async fn upload(&self, file: FileUpload) -> Result<String, ClientError> {
        if file.name.starts_with("bad") {
            return Err(ClientError::Server {
                status: 500,
                message: "Storage unavailable".into(),
            });
        }
        Ok(format!("https://cdn.carehub.test/{}", file.name))
    }
}

/// Holds every upload until the test releases it.
#[derive(Default)]
struct GatedUploader {
    release: Notify,
}

#[async_trait]
impl FileUploader for GatedUploader {
    async fn upload(&self, file: FileUpload) -> Result<String, ClientError> {
        self.release.notified().await;
        Ok(format!("https://cdn.carehub.test/{}", file.name))
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn pdf(name: &str) -> FileUpload {
    FileUpload::new(name, "application/pdf", b"%PDF-1.7".to_vec())
}

fn new_session(store: Arc<FakeStore>, uploader: Arc<dyn FileUploader>) -> Arc<FormSession> {
    let form = FormController::new_record(&MEDICAL_HISTORY, today());
    Arc::new(FormSession::new(form, store, uploader))
}

async fn name_physician(session: &FormSession) {
    session
        .set_field(
            FieldPath::Object {
                object: PRIMARY_CARE_PHYSICIAN,
                field: "name",
            },
            "Dr. Kavya Menon",
        )
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Test: hydrate then submit without edits sends the same content back
// ---------------------------------------------------------------------------

#[tokio::test]
async fn edit_free_round_trip_updates_with_original_content() {
    let content = json!({
        "bloodGroup": "B+",
        "height": "165",
        "weight": "58",
        "isSmoker": false,
        "lastCheckup": "2024-04-02T00:00:00.000Z",
        "additionalNotes": "",
        "primaryPhysician": { "name": "Dr. Kavya Menon", "phone": "9876543210", "hospitalName": "" },
        "conditions": [
            { "condition": "Migraine", "diagnosisDate": "2021-01-10T00:00:00.000Z", "status": "Active" }
        ],
        "treatingDoctors": [
            { "name": "Dr. Arjun Das", "hospitalName": "City Neuro", "speciality": "Neurology" }
        ],
        "currentMedications": [],
        "pastSurgeries": [],
        "allergies": [],
        "medicalReports": [
            { "title": "MRI", "fileUrl": "https://cdn.carehub.test/mri.pdf" }
        ]
    });
    let mut fetched = content.clone();
    fetched["_id"] = json!("MH-42");
    fetched["updatedAt"] = json!("2024-05-01T09:00:00.000Z");

    let store = Arc::new(FakeStore::default());
    let form = FormController::hydrate(&MEDICAL_HISTORY, &fetched, today()).unwrap();
    let session = FormSession::new(form, store.clone(), Arc::new(FakeUploader));

    let saved = session.submit().await.unwrap();
    assert_eq!(saved["_id"], "MH-42");
    assert_eq!(store.calls(), vec![Call::Update("MH-42".into(), content)]);
    assert!(session.is_closed().await);
}

// ---------------------------------------------------------------------------
// Test: the only row of a keep-one list cannot be removed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn removing_the_only_treating_doctor_is_refused() {
    let session = new_session(Arc::new(FakeStore::default()), Arc::new(FakeUploader));

    assert_matches!(
        session.remove_list_item(TREATING_DOCTORS, 0).await,
        Err(CoreError::MinimumItems { min: 1, .. })
    );
    assert_eq!(session.read(|f| f.rows(TREATING_DOCTORS).unwrap().len()).await, 1);

    session.add_list_item(TREATING_DOCTORS).await.unwrap();
    session.remove_list_item(TREATING_DOCTORS, 0).await.unwrap();
    assert_eq!(session.read(|f| f.rows(TREATING_DOCTORS).unwrap().len()).await, 1);
}

// ---------------------------------------------------------------------------
// Test: a failed upload affects only its own slot
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_failure_is_isolated_to_its_slot() {
    let store = Arc::new(FakeStore::default());
    let session = new_session(store.clone(), Arc::new(FakeUploader));
    name_physician(&session).await;
    session.add_list_item(REPORTS).await.unwrap();
    session
        .set_field(FieldPath::ListItem { list: REPORTS, index: 0, field: "title" }, "CBC")
        .await
        .unwrap();

    let good = session.attach_file(REPORTS, 0, pdf("cbc.pdf")).await.unwrap();
    let bad = session.attach_file(REPORTS, 1, pdf("bad-scan.pdf")).await.unwrap();

    assert_eq!(
        good,
        UploadOutcome::Uploaded {
            url: "https://cdn.carehub.test/cbc.pdf".into()
        }
    );
    assert_eq!(
        bad,
        UploadOutcome::Failed {
            message: "Storage unavailable".into()
        }
    );

    let (first, second) = session
        .read(|f| (f.slot(REPORTS, 0).unwrap().clone(), f.slot(REPORTS, 1).unwrap().clone()))
        .await;
    assert!(first.is_uploaded());
    assert_eq!(first.error, None);
    assert_eq!(second.error.as_deref(), Some("Storage unavailable"));
    assert!(!second.is_uploading);
    assert_eq!(second.local_file.map(|m| m.name).as_deref(), Some("bad-scan.pdf"));

    session.submit().await.unwrap();
    let calls = store.calls();
    assert_matches!(
        calls.as_slice(),
        [Call::Create(payload)]
            if payload["medicalReports"]
                == json!([{ "title": "CBC", "fileUrl": "https://cdn.carehub.test/cbc.pdf" }])
    );
}

#[tokio::test]
async fn attaching_to_a_missing_row_is_an_error() {
    let session = new_session(Arc::new(FakeStore::default()), Arc::new(FakeUploader));
    assert_matches!(
        session.attach_file(REPORTS, 5, pdf("cbc.pdf")).await,
        Err(ClientError::Core(CoreError::IndexOutOfRange { index: 5, .. }))
    );
}

// ---------------------------------------------------------------------------
// Test: a failed submit keeps edits and can be retried
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_failure_keeps_edits_for_retry() {
    let store = FakeStore::failing_once("Member not found");
    let session = new_session(store.clone(), Arc::new(FakeUploader));
    name_physician(&session).await;
    session
        .set_field(FieldPath::Scalar("bloodGroup"), "AB-")
        .await
        .unwrap();

    let err = session.submit().await.unwrap_err();
    assert_matches!(err, ClientError::Server { status: 404, .. });
    assert_eq!(session.submit_error().await.as_deref(), Some("Member not found"));
    assert!(!session.is_closed().await);
    assert_eq!(
        session
            .read(|f| f.value(FieldPath::Scalar("bloodGroup")).unwrap())
            .await,
        FieldValue::from("AB-")
    );

    let saved = session.submit().await.unwrap();
    assert_eq!(saved["bloodGroup"], "AB-");
    assert_eq!(session.submit_error().await, None);
    assert!(session.is_closed().await);
    assert_eq!(store.calls().len(), 2);

    assert_matches!(session.submit().await, Err(ClientError::Core(CoreError::Validation(_))));
    assert_eq!(store.calls().len(), 2);
}

// ---------------------------------------------------------------------------
// Test: submit is refused while an upload is in flight
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_waits_for_uploads_to_finish() {
    let store = Arc::new(FakeStore::default());
    let uploader = Arc::new(GatedUploader::default());
    let session = new_session(store.clone(), uploader.clone());
    name_physician(&session).await;

    let upload = tokio::spawn({
        let session = session.clone();
        async move { session.attach_file(REPORTS, 0, pdf("xray.pdf")).await }
    });
    while session.read(|f| f.upload_in_flight().is_none()).await {
        tokio::task::yield_now().await;
    }

    assert_matches!(
        session.submit().await,
        Err(ClientError::Core(CoreError::UploadInFlight { index: 0, .. }))
    );
    assert!(store.calls().is_empty());

    uploader.release.notify_one();
    assert_matches!(upload.await.unwrap(), Ok(UploadOutcome::Uploaded { .. }));

    session.submit().await.unwrap();
    assert_eq!(store.calls().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: required fields block submit without calling the store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_required_fields_block_submit() {
    let store = Arc::new(FakeStore::default());
    let session = new_session(store.clone(), Arc::new(FakeUploader));

    let err = session.submit().await.unwrap_err();
    assert_matches!(err, ClientError::Core(CoreError::Validation(_)));
    assert!(session
        .submit_error()
        .await
        .is_some_and(|m| m.contains("primaryCarePhysician.name")));
    assert!(store.calls().is_empty());
}
