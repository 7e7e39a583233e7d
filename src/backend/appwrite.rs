// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Appwrite REST client.
//!
//! Handles:
//! - Email/password and OAuth token sessions
//! - Account creation and lookup
//! - Profile documents (create/get/update)
//! - Bucket files, including chunked uploads above 5 MiB

use async_trait::async_trait;
use reqwest::{header::HeaderValue, multipart, Method, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::{BackendError, BlobStore, DocumentStore, IdentityService};
use crate::config::Config;
use crate::models::{FileDescriptor, FileUpload, Session, StoredDocument, User};

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Uploads larger than this are sent in `Content-Range` chunks.
const CHUNK_SIZE: usize = 5 * 1024 * 1024;
const RESPONSE_FORMAT: &str = "1.6.0";

/// Error body returned by every failing Appwrite endpoint.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    kind: String,
}

/// Appwrite API client.
#[derive(Clone)]
pub struct AppwriteClient {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    api_key: Option<String>,
}

impl AppwriteClient {
    /// Create a client for one project. `endpoint` includes the `/v1` suffix.
    pub fn new(
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        Self::new(
            config.appwrite_endpoint.clone(),
            config.project_id.clone(),
            config.api_key.clone(),
        )
    }

    /// Request carrying only the project header.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.endpoint, path))
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Response-Format", RESPONSE_FORMAT)
    }

    /// Request authenticated with the server API key, if one is configured.
    ///
    /// Session-creating calls made with a key get the session secret back.
    fn server_request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.request(method, path);
        match &self.api_key {
            Some(key) => request.header("X-Appwrite-Key", key),
            None => request,
        }
    }

    /// Request acting as the user owning `secret`.
    fn session_request(
        &self,
        method: Method,
        path: &str,
        secret: &str,
    ) -> Result<RequestBuilder, BackendError> {
        let value = HeaderValue::from_str(secret)
            .map_err(|_| BackendError::api(401, "user_session_invalid", "Invalid session"))?;
        Ok(self.request(method, path).header("X-Appwrite-Session", value))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::Decode(format!("JSON parse error: {}", e)))
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), BackendError> {
        let response = request.send().await?;
        Self::check_response(response).await?;
        Ok(())
    }

    /// Check response status and convert Appwrite error bodies.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if status == 429 {
            tracing::warn!("Appwrite rate limit hit (429)");
        }

        let err = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) => BackendError::api(status, parsed.kind, parsed.message),
            Err(_) => BackendError::api(status, "", body),
        };

        tracing::debug!(status, error = %err, "Appwrite request failed");
        Err(err)
    }

    fn document_path(database_id: &str, collection_id: &str) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            urlencoding::encode(database_id),
            urlencoding::encode(collection_id)
        )
    }

    fn file_path(bucket_id: &str) -> String {
        format!("/storage/buckets/{}/files", urlencoding::encode(bucket_id))
    }

    fn file_part(upload: &FileUpload, bytes: Vec<u8>) -> Result<multipart::Part, BackendError> {
        // Unparseable MIME types are stored as opaque bytes
        let content_type = if multipart::Part::text("").mime_str(&upload.content_type).is_ok() {
            upload.content_type.as_str()
        } else {
            "application/octet-stream"
        };

        Ok(multipart::Part::bytes(bytes)
            .file_name(upload.name.clone())
            .mime_str(content_type)?)
    }
}

#[async_trait]
impl IdentityService for AppwriteClient {
    async fn create_email_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let request = self
            .server_request(Method::POST, "/account/sessions/email")
            .json(&json!({ "email": email, "password": password }));
        self.send_json(request).await
    }

    async fn create_account(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, BackendError> {
        let request = self.server_request(Method::POST, "/account").json(&json!({
            "userId": user_id,
            "email": email,
            "password": password,
            "name": name,
        }));
        self.send_json(request).await
    }

    fn oauth_token_url(
        &self,
        provider: &str,
        success: &str,
        failure: &str,
    ) -> Result<String, BackendError> {
        let base = format!(
            "{}/account/tokens/oauth2/{}",
            self.endpoint,
            urlencoding::encode(provider)
        );
        let url = Url::parse_with_params(
            &base,
            &[
                ("project", self.project_id.as_str()),
                ("success", success),
                ("failure", failure),
            ],
        )
        .map_err(|e| BackendError::Decode(format!("Invalid OAuth URL: {}", e)))?;
        Ok(url.to_string())
    }

    async fn create_token_session(
        &self,
        user_id: &str,
        secret: &str,
    ) -> Result<Session, BackendError> {
        let request = self
            .server_request(Method::POST, "/account/sessions/token")
            .json(&json!({ "userId": user_id, "secret": secret }));
        self.send_json(request).await
    }

    async fn get_account(&self, session_secret: &str) -> Result<User, BackendError> {
        let request = self.session_request(Method::GET, "/account", session_secret)?;
        self.send_json(request).await
    }

    async fn delete_session(
        &self,
        session_secret: &str,
        session_id: &str,
    ) -> Result<(), BackendError> {
        let path = format!("/account/sessions/{}", urlencoding::encode(session_id));
        let request = self.session_request(Method::DELETE, &path, session_secret)?;
        self.send_empty(request).await
    }
}

#[async_trait]
impl DocumentStore for AppwriteClient {
    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: &Value,
    ) -> Result<StoredDocument, BackendError> {
        let path = Self::document_path(database_id, collection_id);
        let request = self
            .server_request(Method::POST, &path)
            .json(&json!({ "documentId": document_id, "data": data }));
        self.send_json(request).await
    }

    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> Result<StoredDocument, BackendError> {
        let path = format!(
            "{}/{}",
            Self::document_path(database_id, collection_id),
            urlencoding::encode(document_id)
        );
        self.send_json(self.server_request(Method::GET, &path)).await
    }

    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: &Value,
        expected_revision: Option<&str>,
    ) -> Result<StoredDocument, BackendError> {
        // The REST API has no conditional write, so the revision is compared
        // immediately before the PATCH. This narrows the race window but
        // cannot close it.
        if let Some(expected) = expected_revision {
            let current = self
                .get_document(database_id, collection_id, document_id)
                .await?;
            if current.revision != expected {
                tracing::debug!(
                    document_id,
                    expected,
                    current = %current.revision,
                    "Document revision changed"
                );
                return Err(BackendError::Conflict);
            }
        }

        let path = format!(
            "{}/{}",
            Self::document_path(database_id, collection_id),
            urlencoding::encode(document_id)
        );
        let request = self
            .server_request(Method::PATCH, &path)
            .json(&json!({ "data": data }));
        self.send_json(request).await
    }
}

#[async_trait]
impl BlobStore for AppwriteClient {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        upload: &FileUpload,
    ) -> Result<FileDescriptor, BackendError> {
        let path = Self::file_path(bucket_id);
        let total = upload.bytes.len();

        if total <= CHUNK_SIZE {
            let form = multipart::Form::new()
                .text("fileId", file_id.to_string())
                .part("file", Self::file_part(upload, upload.bytes.clone())?);
            return self
                .send_json(self.server_request(Method::POST, &path).multipart(form))
                .await;
        }

        let mut descriptor = None;
        for (index, chunk) in upload.bytes.chunks(CHUNK_SIZE).enumerate() {
            let start = index * CHUNK_SIZE;
            let end = start + chunk.len() - 1;

            let mut request = self
                .server_request(Method::POST, &path)
                .header("Content-Range", format!("bytes {}-{}/{}", start, end, total));
            if index > 0 {
                request = request.header("X-Appwrite-ID", file_id);
            }

            let form = multipart::Form::new()
                .text("fileId", file_id.to_string())
                .part("file", Self::file_part(upload, chunk.to_vec())?);

            tracing::debug!(file_id, start, end, total, "Uploading chunk");
            descriptor = Some(self.send_json(request.multipart(form)).await?);
        }

        descriptor.ok_or_else(|| BackendError::Decode("Upload produced no response".to_string()))
    }

    fn download_url(&self, bucket_id: &str, file_id: &str) -> Result<String, BackendError> {
        let base = format!(
            "{}{}/{}/download",
            self.endpoint,
            Self::file_path(bucket_id),
            urlencoding::encode(file_id)
        );
        let url = Url::parse_with_params(&base, &[("project", self.project_id.as_str())])
            .map_err(|e| BackendError::Decode(format!("Invalid download URL: {}", e)))?;
        Ok(url.to_string())
    }

    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> Result<(), BackendError> {
        let path = format!(
            "{}/{}",
            Self::file_path(bucket_id),
            urlencoding::encode(file_id)
        );
        self.send_empty(self.server_request(Method::DELETE, &path))
            .await
    }
}
