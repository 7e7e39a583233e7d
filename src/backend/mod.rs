// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend services (identity, documents, blobs).
//!
//! The gateway only talks to these traits. `AppwriteClient` implements all
//! three against the hosted REST API; `MemoryBackend` implements them
//! in-process for tests and offline runs.

pub mod appwrite;
pub mod memory;

pub use appwrite::AppwriteClient;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{FileDescriptor, FileUpload, Session, StoredDocument, User};

/// Failure reported by a backend service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// The service answered with an error status.
    #[error("{message}")]
    Api {
        status: u16,
        /// Machine-readable error type, e.g. `user_invalid_credentials`
        kind: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    /// An update's expected revision no longer matches the stored document.
    #[error("Document was modified concurrently")]
    Conflict,
}

impl BackendError {
    pub fn api(status: u16, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_already_exists(&self) -> bool {
        self.status() == Some(409)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Account and session operations.
///
/// Calls that act on an existing session take its secret explicitly; the
/// service itself holds no per-user state.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn create_email_session(&self, email: &str, password: &str)
        -> Result<Session, BackendError>;

    async fn create_account(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, BackendError>;

    /// URL that starts the provider's consent flow. The provider returns the
    /// browser to `success` with `userId` and `secret`, or to `failure`.
    fn oauth_token_url(
        &self,
        provider: &str,
        success: &str,
        failure: &str,
    ) -> Result<String, BackendError>;

    /// Exchange the OAuth callback credentials for a session.
    async fn create_token_session(&self, user_id: &str, secret: &str)
        -> Result<Session, BackendError>;

    async fn get_account(&self, session_secret: &str) -> Result<User, BackendError>;

    /// `session_id` may be `current` for the session owning the secret.
    async fn delete_session(&self, session_secret: &str, session_id: &str)
        -> Result<(), BackendError>;
}

/// Document storage keyed by (database, collection, document ID).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: &Value,
    ) -> Result<StoredDocument, BackendError>;

    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> Result<StoredDocument, BackendError>;

    /// Merge `data` into the document. With `expected_revision`, fails with
    /// [`BackendError::Conflict`] if the document changed since that revision.
    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: &Value,
        expected_revision: Option<&str>,
    ) -> Result<StoredDocument, BackendError>;
}

/// Blob storage keyed by (bucket, file ID).
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        upload: &FileUpload,
    ) -> Result<FileDescriptor, BackendError>;

    /// Download URL for the file. No existence check is made.
    fn download_url(&self, bucket_id: &str, file_id: &str) -> Result<String, BackendError>;

    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> Result<(), BackendError>;
}
