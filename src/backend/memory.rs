// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process backend.
//!
//! Mirrors the hosted service's observable behaviour closely enough for the
//! gateway: the same error statuses and types, per-document atomic updates,
//! and revision stamps that change on every write. Passwords are kept in
//! plain text, so this backend is for tests and local runs only.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{BackendError, BlobStore, DocumentStore, IdentityService};
use crate::ids;
use crate::models::{FileDescriptor, FileUpload, Session, StoredDocument, User, UserPrefs};
use crate::time_utils::now_rfc3339;

type DocumentKey = (String, String, String);
type FileKey = (String, String);

struct Account {
    user: User,
    password: String,
}

/// Credentials handed out by the simulated OAuth provider.
struct OAuthToken {
    user_id: String,
    secret: String,
}

/// In-memory implementation of every backend service.
#[derive(Default)]
pub struct MemoryBackend {
    /// Accounts keyed by user ID
    accounts: DashMap<String, Account>,
    /// Email → user ID
    emails: DashMap<String, String>,
    /// Session secret → session
    sessions: DashMap<String, Session>,
    /// Pending OAuth tokens keyed by user ID
    oauth_tokens: DashMap<String, OAuthToken>,
    documents: DashMap<DocumentKey, StoredDocument>,
    files: DashMap<FileKey, (FileDescriptor, Vec<u8>)>,
    revisions: AtomicU64,
}

fn id_error(_: ring::error::Unspecified) -> BackendError {
    BackendError::api(500, "general_unknown", "Failed to generate identifier")
}

fn unauthorized() -> BackendError {
    BackendError::api(
        401,
        "general_unauthorized_scope",
        "User (role: guests) missing scope (account)",
    )
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a user granting consent at the OAuth provider.
    ///
    /// Creates the account on first use (with `picture` in its prefs) and
    /// returns the `(user_id, secret)` pair the provider would append to the
    /// success URL.
    pub fn grant_oauth_consent(
        &self,
        email: &str,
        name: &str,
        picture: Option<&str>,
    ) -> Result<(String, String), BackendError> {
        let existing = self.emails.get(email).map(|e| e.value().clone());
        let user_id = match existing {
            Some(user_id) => user_id,
            None => {
                let user_id = ids::unique().map_err(id_error)?;
                let user = User {
                    id: user_id.clone(),
                    email: email.to_string(),
                    name: name.to_string(),
                    prefs: UserPrefs {
                        picture: picture.map(str::to_string),
                    },
                };
                self.emails.insert(email.to_string(), user_id.clone());
                self.accounts.insert(
                    user_id.clone(),
                    Account {
                        user,
                        password: String::new(),
                    },
                );
                user_id
            }
        };

        let secret = ids::random_hex(32).map_err(id_error)?;
        self.oauth_tokens.insert(
            user_id.clone(),
            OAuthToken {
                user_id: user_id.clone(),
                secret: secret.clone(),
            },
        );
        Ok((user_id, secret))
    }

    /// Invalidate every session, as if they all expired server-side.
    pub fn expire_sessions(&self) {
        self.sessions.clear();
    }

    /// Number of stored documents in a collection.
    pub fn document_count(&self, database_id: &str, collection_id: &str) -> usize {
        self.documents
            .iter()
            .filter(|e| e.key().0 == database_id && e.key().1 == collection_id)
            .count()
    }

    /// Number of blobs in a bucket.
    pub fn file_count(&self, bucket_id: &str) -> usize {
        self.files.iter().filter(|e| e.key().0 == bucket_id).count()
    }

    /// Contents of a stored blob.
    pub fn file_bytes(&self, bucket_id: &str, file_id: &str) -> Option<Vec<u8>> {
        self.files
            .get(&(bucket_id.to_string(), file_id.to_string()))
            .map(|e| e.value().1.clone())
    }

    fn issue_session(&self, user_id: &str, provider_uid: &str) -> Result<Session, BackendError> {
        let session = Session {
            id: ids::unique().map_err(id_error)?,
            user_id: user_id.to_string(),
            provider_uid: provider_uid.to_string(),
            secret: ids::random_hex(64).map_err(id_error)?,
            expire: String::new(),
        };
        self.sessions.insert(session.secret.clone(), session.clone());
        Ok(session)
    }

    fn next_revision(&self) -> String {
        let n = self.revisions.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}#{}", now_rfc3339(), n)
    }

    fn key(database_id: &str, collection_id: &str, document_id: &str) -> DocumentKey {
        (
            database_id.to_string(),
            collection_id.to_string(),
            document_id.to_string(),
        )
    }
}

fn document_not_found() -> BackendError {
    BackendError::api(
        404,
        "document_not_found",
        "Document with the requested ID could not be found.",
    )
}

fn object(data: &Value) -> Result<serde_json::Map<String, Value>, BackendError> {
    match data {
        Value::Object(map) => Ok(map.clone()),
        _ => Err(BackendError::api(
            400,
            "document_invalid_structure",
            "Invalid document structure: data must be an object",
        )),
    }
}

#[async_trait]
impl IdentityService for MemoryBackend {
    async fn create_email_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let invalid = || {
            BackendError::api(
                401,
                "user_invalid_credentials",
                "Invalid credentials. Please check the email and password.",
            )
        };

        let user_id = self
            .emails
            .get(email)
            .map(|e| e.value().clone())
            .ok_or_else(invalid)?;
        {
            let account = self.accounts.get(&user_id).ok_or_else(invalid)?;
            if account.password.is_empty() || account.password != password {
                return Err(invalid());
            }
        }

        self.issue_session(&user_id, email)
    }

    async fn create_account(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, BackendError> {
        let exists = || {
            BackendError::api(
                409,
                "user_already_exists",
                "A user with the same id, email, or phone already exists in this project.",
            )
        };

        if self.accounts.contains_key(user_id) {
            return Err(exists());
        }
        match self.emails.entry(email.to_string()) {
            Entry::Occupied(_) => return Err(exists()),
            Entry::Vacant(slot) => {
                slot.insert(user_id.to_string());
            }
        }

        let user = User {
            id: user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            prefs: UserPrefs::default(),
        };
        self.accounts.insert(
            user_id.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        Ok(user)
    }

    fn oauth_token_url(
        &self,
        provider: &str,
        success: &str,
        failure: &str,
    ) -> Result<String, BackendError> {
        Ok(format!(
            "memory://oauth2/{}?success={}&failure={}",
            urlencoding::encode(provider),
            urlencoding::encode(success),
            urlencoding::encode(failure)
        ))
    }

    async fn create_token_session(
        &self,
        user_id: &str,
        secret: &str,
    ) -> Result<Session, BackendError> {
        let token = self
            .oauth_tokens
            .remove_if(user_id, |_, token| token.secret == secret)
            .map(|(_, token)| token)
            .ok_or_else(|| {
                BackendError::api(401, "user_invalid_token", "Invalid token passed in the request.")
            })?;

        let email = self
            .accounts
            .get(&token.user_id)
            .map(|a| a.user.email.clone())
            .unwrap_or_default();
        self.issue_session(&token.user_id, &email)
    }

    async fn get_account(&self, session_secret: &str) -> Result<User, BackendError> {
        let user_id = self
            .sessions
            .get(session_secret)
            .map(|s| s.user_id.clone())
            .ok_or_else(unauthorized)?;
        self.accounts
            .get(&user_id)
            .map(|a| a.user.clone())
            .ok_or_else(unauthorized)
    }

    async fn delete_session(
        &self,
        session_secret: &str,
        session_id: &str,
    ) -> Result<(), BackendError> {
        let owner = self
            .sessions
            .get(session_secret)
            .map(|s| (s.id.clone(), s.user_id.clone()))
            .ok_or_else(unauthorized)?;

        if session_id == "current" || session_id == owner.0 {
            self.sessions.remove(session_secret);
            return Ok(());
        }

        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| !(s.id == session_id && s.user_id == owner.1));
        if self.sessions.len() == before {
            return Err(BackendError::api(
                404,
                "user_session_not_found",
                "The current user session could not be found.",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: &Value,
    ) -> Result<StoredDocument, BackendError> {
        let data = object(data)?;
        match self
            .documents
            .entry(Self::key(database_id, collection_id, document_id))
        {
            Entry::Occupied(_) => Err(BackendError::api(
                409,
                "document_already_exists",
                "Document with the requested ID already exists.",
            )),
            Entry::Vacant(slot) => {
                let doc = StoredDocument {
                    id: document_id.to_string(),
                    revision: self.next_revision(),
                    data,
                };
                slot.insert(doc.clone());
                Ok(doc)
            }
        }
    }

    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> Result<StoredDocument, BackendError> {
        self.documents
            .get(&Self::key(database_id, collection_id, document_id))
            .map(|e| e.value().clone())
            .ok_or_else(document_not_found)
    }

    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: &Value,
        expected_revision: Option<&str>,
    ) -> Result<StoredDocument, BackendError> {
        let patch = object(data)?;
        // The shard lock is held from the revision check through the write.
        let mut doc = self
            .documents
            .get_mut(&Self::key(database_id, collection_id, document_id))
            .ok_or_else(document_not_found)?;

        if let Some(expected) = expected_revision {
            if doc.revision != expected {
                return Err(BackendError::Conflict);
            }
        }

        doc.data.extend(patch);
        doc.revision = self.next_revision();
        Ok(doc.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBackend {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        upload: &FileUpload,
    ) -> Result<FileDescriptor, BackendError> {
        match self
            .files
            .entry((bucket_id.to_string(), file_id.to_string()))
        {
            Entry::Occupied(_) => Err(BackendError::api(
                409,
                "storage_file_already_exists",
                "A storage file with the requested ID already exists.",
            )),
            Entry::Vacant(slot) => {
                let descriptor = FileDescriptor {
                    id: file_id.to_string(),
                    bucket_id: bucket_id.to_string(),
                    name: upload.name.clone(),
                    mime_type: upload.content_type.clone(),
                    size_original: upload.size(),
                    created_at: now_rfc3339(),
                };
                slot.insert((descriptor.clone(), upload.bytes.clone()));
                Ok(descriptor)
            }
        }
    }

    fn download_url(&self, bucket_id: &str, file_id: &str) -> Result<String, BackendError> {
        Ok(format!(
            "memory://storage/buckets/{}/files/{}/download",
            urlencoding::encode(bucket_id),
            urlencoding::encode(file_id)
        ))
    }

    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> Result<(), BackendError> {
        self.files
            .remove(&(bucket_id.to_string(), file_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| {
                BackendError::api(
                    404,
                    "storage_file_not_found",
                    "The requested file could not be found.",
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_email_session_requires_matching_password() {
        let backend = MemoryBackend::new();
        backend
            .create_account("u1", "a@example.com", "password1", "A")
            .await
            .unwrap();

        let err = backend
            .create_email_session("a@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));

        let session = backend
            .create_email_session("a@example.com", "password1")
            .await
            .unwrap();
        assert_eq!(session.user_id, "u1");
        assert_eq!(session.provider_uid, "a@example.com");
        assert_eq!(backend.get_account(&session.secret).await.unwrap().id, "u1");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let backend = MemoryBackend::new();
        backend
            .create_account("u1", "a@example.com", "password1", "A")
            .await
            .unwrap();
        let err = backend
            .create_account("u2", "a@example.com", "password2", "B")
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_update_with_stale_revision_conflicts() {
        let backend = MemoryBackend::new();
        let created = backend
            .create_document("db", "col", "d1", &json!({"files": []}))
            .await
            .unwrap();

        let updated = backend
            .update_document("db", "col", "d1", &json!({"files": [1]}), Some(&created.revision))
            .await
            .unwrap();
        assert_ne!(updated.revision, created.revision);

        let err = backend
            .update_document("db", "col", "d1", &json!({"files": [2]}), Some(&created.revision))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Conflict));
    }

    #[tokio::test]
    async fn test_oauth_token_is_single_use() {
        let backend = MemoryBackend::new();
        let (user_id, secret) = backend
            .grant_oauth_consent("g@example.com", "G", Some("https://example.com/g.png"))
            .unwrap();

        let session = backend.create_token_session(&user_id, &secret).await.unwrap();
        let user = backend.get_account(&session.secret).await.unwrap();
        assert_eq!(user.avatar_url(), Some("https://example.com/g.png"));

        let err = backend
            .create_token_session(&user_id, &secret)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_delete_current_session() {
        let backend = MemoryBackend::new();
        backend
            .create_account("u1", "a@example.com", "password1", "A")
            .await
            .unwrap();
        let session = backend
            .create_email_session("a@example.com", "password1")
            .await
            .unwrap();

        backend.delete_session(&session.secret, "current").await.unwrap();
        assert!(backend.get_account(&session.secret).await.is_err());
        assert!(backend
            .delete_session(&session.secret, "current")
            .await
            .is_err());
    }
}
