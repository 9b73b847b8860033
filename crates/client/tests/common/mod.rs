//! In-process stub of the admin API, bound to an ephemeral local port.
//!
//! Every request is recorded so tests can assert on exactly what the
//! client sent (query strings, bearer tokens, bodies).

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use carehub_client::api::ApiClient;
use carehub_client::session::{MemorySessionStore, SessionContext};

pub const GOOD_PASSWORD: &str = "correct-horse";
pub const TOKEN: &str = "tok-abc";
pub const DOCTOR_COUNT: u64 = 27;

/// One request as the stub saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Recorded>>>);

impl Recorder {
    pub fn all(&self) -> Vec<Recorded> {
        self.0.lock().unwrap().clone()
    }

    /// Raw query strings of every request to `path`, in order.
    pub fn queries(&self, path: &str) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|r| r.path == path)
            .map(|r| r.query.unwrap_or_default())
            .collect()
    }

    fn push(&self, method: &Method, uri: &Uri, headers: &HeaderMap) {
        self.0.lock().unwrap().push(Recorded {
            method: method.clone(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            authorization: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });
    }
}

pub struct StubBackend {
    pub base_url: String,
    pub recorder: Recorder,
}

/// Start the stub and return its base URL (ending in `/api`).
pub async fn spawn_backend() -> StubBackend {
    let recorder = Recorder::default();
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/profile", get(profile).patch(update_profile))
        .route("/api/doctors", get(list_doctors))
        .route("/api/appointments", get(list_appointments))
        .route("/api/reports", get(list_reports))
        .route("/api/upload", post(upload))
        .route("/api/medical-history", post(create_history))
        .route("/api/medical-history/{id}", get(get_history).put(update_history))
        .with_state(recorder.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubBackend {
        base_url: format!("http://{addr}/api"),
        recorder,
    }
}

/// API client with a fresh in-memory session pointed at `backend`.
pub fn api_client(backend: &StubBackend) -> Arc<ApiClient> {
    let session = Arc::new(SessionContext::new(MemorySessionStore::default()));
    Arc::new(ApiClient::with_client(
        reqwest::Client::new(),
        backend.base_url.clone(),
        session,
    ))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "fail", "message": message }))).into_response()
}

async fn login(
    State(recorder): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    recorder.push(&method, &uri, &headers);
    if body["password"] != GOOD_PASSWORD {
        return fail(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }
    Json(json!({
        "status": "success",
        "data": {
            "token": TOKEN,
            "refreshToken": "ref-abc",
            "user": { "_id": "U1", "name": "Asha Rao", "email": body["email"] }
        }
    }))
    .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn profile(
    State(recorder): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    recorder.push(&method, &uri, &headers);
    if !authorized(&headers) {
        return fail(StatusCode::UNAUTHORIZED, "Not authorized");
    }
    Json(json!({
        "status": "success",
        "data": { "name": "Asha Rao", "email": "asha@carehub.test", "phone": "9876543210" }
    }))
    .into_response()
}

async fn update_profile(
    State(recorder): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    recorder.push(&method, &uri, &headers);
    if !authorized(&headers) {
        return fail(StatusCode::UNAUTHORIZED, "Not authorized");
    }
    Json(json!({ "status": "success", "data": body })).into_response()
}

async fn list_doctors(
    State(recorder): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    recorder.push(&method, &uri, &headers);
    let page: u64 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: u64 = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);

    let doctors: Vec<Value> = (1..=DOCTOR_COUNT)
        .map(|i| {
            json!({
                "_id": format!("DOC{i:03}"),
                "name": format!("Dr. Doctor {i}"),
                "speciality": if i % 2 == 0 { "Cardiology" } else { "Pediatrics" },
                "city": "Pune",
                "pincode": "411001",
                "status": "active",
                "__v": 0
            })
        })
        .filter(|d| match params.get("speciality") {
            Some(s) => d["speciality"] == s.as_str(),
            None => true,
        })
        .collect();

    let total = doctors.len() as u64;
    let pages = total.div_ceil(limit);
    let data: Vec<Value> = doctors
        .into_iter()
        .skip(((page - 1) * limit) as usize)
        .take(limit as usize)
        .collect();

    Json(json!({
        "status": "success",
        "data": data,
        "pagination": { "total": total, "page": page, "pages": pages, "limit": limit }
    }))
    .into_response()
}

async fn list_appointments(
    State(recorder): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    recorder.push(&method, &uri, &headers);
    Json(json!({
        "status": "success",
        "data": [],
        "pagination": { "total": 0, "page": 1, "pages": 0, "limit": 10 }
    }))
    .into_response()
}

async fn list_reports(
    State(recorder): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    recorder.push(&method, &uri, &headers);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "error", "message": "Report service unavailable" })),
    )
        .into_response()
}

async fn upload(
    State(recorder): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    recorder.push(&method, &uri, &headers);
    let mut file_name = None;
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
            let _ = field.bytes().await.unwrap();
        }
    }

    match file_name.as_deref() {
        None => fail(StatusCode::BAD_REQUEST, "No file provided"),
        Some("corrupt.pdf") => (
            StatusCode::OK,
            Json(json!({ "success": false, "message": "Unsupported file" })),
        )
            .into_response(),
        Some(name) => Json(json!({
            "success": true,
            "imageUrl": format!("https://cdn.carehub.test/{name}")
        }))
        .into_response(),
    }
}

async fn create_history(
    State(recorder): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    recorder.push(&method, &uri, &headers);
    body["_id"] = json!("MH-1");
    (
        StatusCode::CREATED,
        Json(json!({ "status": "success", "data": body })),
    )
        .into_response()
}

async fn get_history(
    State(recorder): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    recorder.push(&method, &uri, &headers);
    if id == "deleted" {
        return Json(json!({ "status": "success", "data": null })).into_response();
    }
    Json(json!({ "status": "success", "data": { "_id": id, "height": 172 } })).into_response()
}

async fn update_history(
    State(recorder): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(mut body): Json<Value>,
) -> Response {
    recorder.push(&method, &uri, &headers);
    if id == "missing" {
        return fail(StatusCode::NOT_FOUND, "Medical history not found");
    }
    body["_id"] = json!(id);
    Json(json!({ "status": "success", "data": body })).into_response()
}
