//! REST client for the CareHub admin API.
//!
//! Wraps the HTTP endpoints (login, paginated lists, record CRUD, profile,
//! file upload) using [`reqwest`]. Every request carries the session's
//! bearer token when one is present.
//!
//! Response bodies use a `{status, data, pagination?}` envelope. Failures
//! are either a non-2xx status or a 2xx body whose `status` is not
//! `"success"`; both become [`ClientError::Server`] carrying the body's
//! `message` (or `error`) text.

use std::sync::Arc;

use async_trait::async_trait;
use carehub_core::error::CoreError;
use carehub_core::profile::{ChangePasswordForm, ProfileForm};
use carehub_core::query::{CollectionPage, CollectionQuery, Pagination};
use carehub_core::resources::Resource;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::form::{FileUpload, FileUploader};
use crate::session::{Credentials, SessionContext};

pub const LOGIN_PATH: &str = "auth/login";
pub const PROFILE_PATH: &str = "auth/profile";
pub const CHANGE_PASSWORD_PATH: &str = "auth/change-password";
pub const UPLOAD_PATH: &str = "upload";

/// Multipart field name the upload endpoint reads the file from.
pub const UPLOAD_FIELD: &str = "file";

/// HTTP client for the admin API.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session: Arc<SessionContext>,
}

/// Response returned by the upload endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiClient {
    /// Build a client with the configured base URL and request timeout.
    pub fn new(config: &ClientConfig, session: Arc<SessionContext>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(client, config.api_url.clone(), session))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        session: Arc<SessionContext>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- auth & profile ----

    /// Exchange email and password for a token and start the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Credentials, ClientError> {
        let body = json!({ "email": email.trim(), "password": password });
        let response = self.client.post(self.url(LOGIN_PATH)).json(&body).send().await?;

        let credentials: Credentials = Self::parse_data(response).await?;
        self.session.login(credentials.clone()).await?;
        tracing::info!(email = %email.trim(), "Logged in");
        Ok(credentials)
    }

    /// Fetch the signed-in user's profile and cache it in the session.
    pub async fn fetch_profile(&self) -> Result<Value, ClientError> {
        let response = self.authorized(self.client.get(self.url(PROFILE_PATH))).await.send().await?;
        let profile: Value = Self::parse_data(response).await?;
        self.session.set_profile(profile.clone()).await?;
        Ok(profile)
    }

    /// Validate and save profile edits, refreshing the cached profile.
    pub async fn update_profile(&self, form: ProfileForm) -> Result<Value, ClientError> {
        let form = form.validated()?;
        let response = self
            .authorized(self.client.patch(self.url(PROFILE_PATH)))
            .await
            .json(&form)
            .send()
            .await?;
        let profile: Value = Self::parse_data(response).await?;
        self.session.set_profile(profile.clone()).await?;
        Ok(profile)
    }

    pub async fn change_password(&self, form: ChangePasswordForm) -> Result<(), ClientError> {
        let form = form.validated()?;
        let response = self
            .authorized(self.client.post(self.url(CHANGE_PASSWORD_PATH)))
            .await
            .json(&form)
            .send()
            .await?;
        Self::read_envelope(response).await?;
        Ok(())
    }

    // ---- collections & records ----

    /// Fetch one page of `resource`.
    ///
    /// Only non-empty filters are sent. A response without a pagination
    /// block is treated as a single page.
    pub async fn list<T: DeserializeOwned>(
        &self,
        resource: Resource,
        query: &CollectionQuery,
    ) -> Result<CollectionPage<T>, ClientError> {
        let response = self
            .authorized(self.client.get(self.url(resource.path())))
            .await
            .query(&query.to_params())
            .send()
            .await?;

        let mut envelope = Self::read_envelope(response).await?;
        let items: Vec<T> = serde_json::from_value(take_data(&mut envelope))?;
        let pagination = match envelope.get_mut("pagination").map(Value::take) {
            Some(raw) if !raw.is_null() => serde_json::from_value::<Pagination>(raw)?,
            _ => Pagination {
                total: items.len() as u64,
                page: query.page,
                pages: 1,
                limit: query.limit,
            },
        };
        Ok(CollectionPage { items, pagination })
    }

    /// Fetch one record. A success envelope without data means the record
    /// is gone.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &'static str,
        id: &str,
    ) -> Result<T, ClientError> {
        let response = self
            .authorized(self.client.get(self.record_url(path, id)))
            .await
            .send()
            .await?;
        let mut envelope = Self::read_envelope(response).await?;
        match take_data(&mut envelope) {
            Value::Null => Err(CoreError::NotFound {
                entity: path,
                id: id.to_string(),
            }
            .into()),
            data => Ok(serde_json::from_value(data)?),
        }
    }

    pub async fn create<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .authorized(self.client.post(self.url(path)))
            .await
            .json(body)
            .send()
            .await?;
        Self::parse_data(response).await
    }

    /// Replace a record (`PUT`).
    pub async fn update<B, T>(&self, path: &str, id: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .authorized(self.client.put(self.record_url(path, id)))
            .await
            .json(body)
            .send()
            .await?;
        Self::parse_data(response).await
    }

    /// Partially update a record (`PATCH`).
    pub async fn patch<B, T>(&self, path: &str, id: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .authorized(self.client.patch(self.record_url(path, id)))
            .await
            .json(body)
            .send()
            .await?;
        Self::parse_data(response).await
    }

    pub async fn delete(&self, path: &str, id: &str) -> Result<(), ClientError> {
        let response = self
            .authorized(self.client.delete(self.record_url(path, id)))
            .await
            .send()
            .await?;
        Self::read_envelope(response).await?;
        Ok(())
    }

    /// Upload a file and return the URL the server stored it under.
    pub async fn upload(&self, file: FileUpload) -> Result<String, ClientError> {
        let name = file.name.clone();
        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .authorized(self.client.post(self.url(UPLOAD_PATH)))
            .await
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body: UploadResponse = serde_json::from_value(Self::read_envelope(response).await?)?;

        match body.image_url.filter(|url| body.success && !url.is_empty()) {
            Some(url) => {
                tracing::debug!(file = %name, url = %url, "File uploaded");
                Ok(url)
            }
            None => Err(ClientError::Server {
                status: status.as_u16(),
                message: body.message.unwrap_or_else(|| "Upload failed".to_string()),
            }),
        }
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn record_url(&self, path: &str, id: &str) -> String {
        format!("{}/{}", self.url(path).trim_end_matches('/'), id)
    }

    /// Attach the bearer token, if signed in.
    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Read the body as JSON, turning HTTP and envelope failures into
    /// [`ClientError::Server`].
    async fn read_envelope(response: reqwest::Response) -> Result<Value, ClientError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body, status);
            tracing::debug!(status = status.as_u16(), message = %message, "API request failed");
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        let value: Value = serde_json::from_str(&body)?;
        match value.get("status").and_then(Value::as_str) {
            Some(s) if !s.eq_ignore_ascii_case("success") => Err(ClientError::Server {
                status: status.as_u16(),
                message: error_message(&body, status),
            }),
            _ => Ok(value),
        }
    }

    /// Read the envelope and deserialize its `data` field.
    async fn parse_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let mut envelope = Self::read_envelope(response).await?;
        Ok(serde_json::from_value(take_data(&mut envelope))?)
    }
}

#[async_trait]
impl FileUploader for ApiClient {
    async fn upload(&self, file: FileUpload) -> Result<String, ClientError> {
        ApiClient::upload(self, file).await
    }
}

/// The envelope's `data`, or the whole body when there is no envelope.
fn take_data(envelope: &mut Value) -> Value {
    match envelope.get_mut("data") {
        Some(data) => data.take(),
        None => envelope.take(),
    }
}

/// Human-readable message from an error body: `message`, then `error`,
/// then the raw text, then the status reason.
fn error_message(body: &str, status: StatusCode) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ["message", "error"]
            .iter()
            .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
    });

    from_json
        .filter(|m| !m.trim().is_empty())
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}
