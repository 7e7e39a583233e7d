// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session gateway: the single entry point for authentication and per-user
//! file metadata.
//!
//! A gateway is bound to one user agent. `for_agent` gives each request its
//! own session slot while sharing the backend handles, so the gateway is
//! built once at startup and handed to consumers rather than living in a
//! global.
//!
//! Every backend failure is translated into [`AuthError`], except in
//! [`SessionGateway::get_current_user`], which reports any failure as "no
//! session".

use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use validator::Validate;

use crate::backend::{BackendError, BlobStore, DocumentStore, IdentityService};
use crate::config::Config;
use crate::error::{AuthError, ErrorKind, Result};
use crate::ids;
use crate::models::{
    FileDescriptor, FileMetadata, FileUpload, LoginForm, LoginResult, OAuthCallback, SignupForm,
    User, UserDocument,
};
use crate::time_utils::now_rfc3339;

/// Attempts at a read-modify-write of a profile before giving up.
pub const MAX_UPDATE_ATTEMPTS: usize = 5;

const OAUTH_PROVIDER: &str = "google";

/// The session's secret, or an error when the backend withheld it.
///
/// Appwrite only returns the secret to callers using a server API key; an
/// empty one cannot authenticate later calls.
fn usable_secret(secret: &str, fallback: &str) -> Result<String> {
    if secret.is_empty() {
        tracing::warn!("Session created without a secret; is a server API key configured?");
        return Err(AuthError::unauthorized(fallback));
    }
    Ok(secret.to_string())
}

/// Backend locations and redirect targets the gateway needs.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub database_id: String,
    pub collection_id: String,
    pub bucket_id: String,
    pub oauth_success_url: String,
    pub oauth_failure_url: String,
}

impl From<&Config> for GatewaySettings {
    fn from(config: &Config) -> Self {
        Self {
            database_id: config.database_id.clone(),
            collection_id: config.collection_id.clone(),
            bucket_id: config.bucket_id.clone(),
            oauth_success_url: config.oauth_success_url.clone(),
            oauth_failure_url: config.oauth_failure_url.clone(),
        }
    }
}

/// Where to send the browser to start Google sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthRedirect {
    pub url: String,
}

/// Façade over the identity, document and blob services.
#[derive(Clone)]
pub struct SessionGateway {
    identity: Arc<dyn IdentityService>,
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    settings: Arc<GatewaySettings>,
    /// Session secret of the bound user agent
    session: Arc<RwLock<Option<String>>>,
}

impl SessionGateway {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            identity,
            documents,
            blobs,
            settings: Arc::new(settings),
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Gateway backed by one object implementing every service.
    pub fn with_backend<B>(backend: Arc<B>, settings: GatewaySettings) -> Self
    where
        B: IdentityService + DocumentStore + BlobStore + 'static,
    {
        Self::new(backend.clone(), backend.clone(), backend, settings)
    }

    /// A gateway for another user agent, sharing this one's backends.
    pub fn for_agent(&self, session_secret: Option<String>) -> Self {
        Self {
            identity: self.identity.clone(),
            documents: self.documents.clone(),
            blobs: self.blobs.clone(),
            settings: self.settings.clone(),
            session: Arc::new(RwLock::new(session_secret.filter(|s| !s.is_empty()))),
        }
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Secret of the agent's current session, if one was established or supplied.
    pub async fn session_secret(&self) -> Option<String> {
        self.session.read().await.clone()
    }

    async fn set_session(&self, secret: Option<String>) {
        *self.session.write().await = secret;
    }

    // ─── Authentication ──────────────────────────────────────────

    /// Establish an email/password session for this agent.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult> {
        LoginForm {
            email: email.to_string(),
            password: password.to_string(),
        }
        .validate()
        .map_err(AuthError::from_validation)?;

        let session = self
            .identity
            .create_email_session(email, password)
            .await
            .map_err(|e| AuthError::from_backend(e, AuthError::LOGIN_FAILED))?;
        let secret = usable_secret(&session.secret, AuthError::LOGIN_FAILED)?;

        let result = LoginResult {
            user_id: session.user_id.clone(),
            email: if session.provider_uid.is_empty() {
                email.to_string()
            } else {
                session.provider_uid.clone()
            },
            session_id: session.id.clone(),
        };
        self.set_session(Some(secret)).await;

        tracing::info!(user_id = %result.user_id, "Login successful");
        Ok(result)
    }

    /// Create an account, log in, and create its profile.
    ///
    /// There is no rollback: if login or profile creation fails the account
    /// still exists and the error is returned.
    #[tracing::instrument(skip(self, password))]
    pub async fn signup(&self, email: &str, password: &str, name: &str) -> Result<User> {
        SignupForm {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        }
        .validate()
        .map_err(AuthError::from_validation)?;

        let user_id = ids::unique().map_err(|_| {
            AuthError::new(ErrorKind::Unknown, "Failed to generate account ID")
        })?;

        let user = self
            .identity
            .create_account(&user_id, email, password, name)
            .await
            .map_err(|e| AuthError::from_backend(e, AuthError::SIGNUP_FAILED))?;
        tracing::info!(user_id = %user.id, "Account created");

        if let Err(e) = self.login(email, password).await {
            tracing::warn!(user_id = %user.id, error = %e, "Account created but login failed");
            return Err(e);
        }

        if let Err(e) = self.create_user_document(&user.id, email, name).await {
            tracing::warn!(user_id = %user.id, error = %e, "Account created but profile creation failed");
            return Err(e);
        }

        Ok(user)
    }

    /// Start Google sign-in: the URL of the provider's consent page.
    pub fn login_with_google(&self) -> Result<OAuthRedirect> {
        let url = self
            .identity
            .oauth_token_url(
                OAUTH_PROVIDER,
                &self.settings.oauth_success_url,
                &self.settings.oauth_failure_url,
            )
            .map_err(|e| AuthError::from_backend(e, AuthError::GOOGLE_LOGIN_FAILED))?;

        tracing::info!(provider = OAUTH_PROVIDER, "Starting OAuth flow");
        Ok(OAuthRedirect { url })
    }

    /// Finish Google sign-in once the provider has redirected back.
    #[tracing::instrument(skip(self, callback))]
    pub async fn complete_google_login(&self, callback: &OAuthCallback) -> Result<User> {
        if let Some(error) = callback.error.as_deref().filter(|e| !e.is_empty()) {
            tracing::warn!(error = %error, "OAuth error from provider");
            return Err(AuthError::unauthorized(error));
        }

        let (Some(user_id), Some(secret)) = (
            callback.user_id.as_deref().filter(|s| !s.is_empty()),
            callback.secret.as_deref().filter(|s| !s.is_empty()),
        ) else {
            tracing::warn!("OAuth callback without credentials");
            return Err(AuthError::unauthorized(AuthError::GOOGLE_LOGIN_FAILED));
        };

        let session = self
            .identity
            .create_token_session(user_id, secret)
            .await
            .map_err(|e| AuthError::from_backend(e, AuthError::GOOGLE_LOGIN_FAILED))?;
        let secret = usable_secret(&session.secret, AuthError::GOOGLE_LOGIN_FAILED)?;

        let user = self
            .identity
            .get_account(&secret)
            .await
            .map_err(|e| AuthError::from_backend(e, AuthError::GOOGLE_LOGIN_FAILED))?;
        self.set_session(Some(secret)).await;

        self.create_user_document(&user.id, &user.email, &user.name)
            .await?;

        tracing::info!(user_id = %user.id, "OAuth login successful");
        Ok(user)
    }

    /// End the agent's current session.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let Some(secret) = self.session_secret().await else {
            return Err(AuthError::unauthorized(AuthError::LOGOUT_FAILED));
        };

        self.identity
            .delete_session(&secret, "current")
            .await
            .map_err(|e| AuthError::from_backend(e, AuthError::LOGOUT_FAILED))?;
        self.set_session(None).await;

        tracing::info!("Logout successful");
        Ok(())
    }

    /// The agent's user, or `None` when there is no usable session.
    pub async fn get_current_user(&self) -> Option<User> {
        let secret = self.session_secret().await?;
        match self.identity.get_account(&secret).await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!(error = %e, "No active session");
                None
            }
        }
    }

    // ─── Profile Documents ───────────────────────────────────────

    /// Create the user's profile unless it already exists.
    #[tracing::instrument(skip(self, email, name))]
    pub async fn create_user_document(
        &self,
        user_id: &str,
        email: &str,
        name: &str,
    ) -> Result<UserDocument> {
        let fail = |e| AuthError::from_backend(e, AuthError::PROFILE_FAILED);

        if let Some((existing, _)) = self.fetch_profile(user_id).await.map_err(fail)? {
            tracing::debug!("Profile already exists");
            return Ok(existing);
        }

        let doc = UserDocument::new(user_id, email, name);
        let data = serde_json::to_value(&doc)
            .map_err(|e| AuthError::new(ErrorKind::Unknown, e.to_string()))?;

        match self
            .documents
            .create_document(
                &self.settings.database_id,
                &self.settings.collection_id,
                user_id,
                &data,
            )
            .await
        {
            Ok(_) => {
                tracing::info!("Profile created");
                Ok(doc)
            }
            // Lost a race with another creator; theirs is the record.
            Err(e) if e.is_already_exists() => self
                .fetch_profile(user_id)
                .await
                .map_err(fail)?
                .map(|(existing, _)| existing)
                .ok_or_else(|| AuthError::not_found(AuthError::PROFILE_NOT_FOUND)),
            Err(e) => Err(fail(e)),
        }
    }

    /// The user's profile, or `None` if it was never created.
    pub async fn get_user_document(&self, user_id: &str) -> Result<Option<UserDocument>> {
        Ok(self
            .fetch_profile(user_id)
            .await
            .map_err(|e| AuthError::from_backend(e, AuthError::PROFILE_READ_FAILED))?
            .map(|(doc, _)| doc))
    }

    /// Profile plus the revision it was read at.
    async fn fetch_profile(
        &self,
        user_id: &str,
    ) -> std::result::Result<Option<(UserDocument, String)>, BackendError> {
        let stored = match self
            .documents
            .get_document(
                &self.settings.database_id,
                &self.settings.collection_id,
                user_id,
            )
            .await
        {
            Ok(stored) => stored,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let doc = stored
            .decode()
            .map_err(|e| BackendError::Decode(format!("Malformed profile {}: {}", user_id, e)))?;
        Ok(Some((doc, stored.revision)))
    }

    async fn require_profile(&self, user_id: &str, fallback: &str) -> Result<UserDocument> {
        self.fetch_profile(user_id)
            .await
            .map_err(|e| AuthError::from_backend(e, fallback))?
            .map(|(doc, _)| doc)
            .ok_or_else(|| AuthError::not_found(AuthError::PROFILE_NOT_FOUND))
    }

    /// Read-modify-write of the profile's file list.
    ///
    /// Each write is conditional on the revision that was read; when another
    /// writer got there first the profile is re-read and `edit` re-applied.
    async fn update_files<F>(&self, user_id: &str, fallback: &str, mut edit: F) -> Result<UserDocument>
    where
        F: FnMut(&mut UserDocument),
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let (mut doc, revision) = self
                .fetch_profile(user_id)
                .await
                .map_err(|e| AuthError::from_backend(e, fallback))?
                .ok_or_else(|| AuthError::not_found(AuthError::PROFILE_NOT_FOUND))?;

            edit(&mut doc);

            match self
                .documents
                .update_document(
                    &self.settings.database_id,
                    &self.settings.collection_id,
                    user_id,
                    &json!({ "files": doc.files }),
                    Some(&revision),
                )
                .await
            {
                Ok(_) => return Ok(doc),
                Err(BackendError::Conflict) => {
                    tracing::debug!(user_id, attempt, "Profile changed underneath update, retrying");
                }
                Err(e) => return Err(AuthError::from_backend(e, fallback)),
            }
        }

        tracing::warn!(user_id, "Giving up on profile update after repeated conflicts");
        Err(AuthError::new(
            ErrorKind::Unknown,
            "Profile was modified concurrently, please retry",
        ))
    }

    // ─── File Operations ─────────────────────────────────────────

    /// Store a file and record its metadata in the user's profile.
    #[tracing::instrument(skip(self, upload), fields(name = %upload.name, size = upload.size()))]
    pub async fn upload_file(&self, upload: FileUpload, user_id: &str) -> Result<FileDescriptor> {
        let file_id = ids::unique()
            .map_err(|_| AuthError::new(ErrorKind::Unknown, "Failed to generate file ID"))?;

        let descriptor = self
            .blobs
            .create_file(&self.settings.bucket_id, &file_id, &upload)
            .await
            .map_err(|e| AuthError::from_backend(e, AuthError::UPLOAD_FAILED))?;

        let entry = FileMetadata {
            file_id: descriptor.id.clone(),
            name: upload.name.clone(),
            size: upload.size(),
            content_type: upload.content_type.clone(),
            uploaded_at: now_rfc3339(),
        };

        if let Err(e) = self
            .update_files(user_id, AuthError::UPLOAD_FAILED, |doc| {
                doc.insert_file(entry.clone())
            })
            .await
        {
            // Don't leave a blob nobody can list.
            if let Err(cleanup) = self
                .blobs
                .delete_file(&self.settings.bucket_id, &descriptor.id)
                .await
            {
                tracing::warn!(file_id = %descriptor.id, error = %cleanup, "Failed to remove orphaned blob");
            }
            return Err(e);
        }

        tracing::info!(file_id = %descriptor.id, "File uploaded");
        Ok(descriptor)
    }

    /// URL the browser can fetch the file from.
    pub fn download_file(&self, file_id: &str) -> Result<String> {
        self.blobs
            .download_url(&self.settings.bucket_id, file_id)
            .map_err(|e| AuthError::from_backend(e, AuthError::DOWNLOAD_FAILED))
    }

    /// Delete a file and drop its metadata from the user's profile.
    #[tracing::instrument(skip(self))]
    pub async fn delete_file(&self, file_id: &str, user_id: &str) -> Result<()> {
        self.blobs
            .delete_file(&self.settings.bucket_id, file_id)
            .await
            .map_err(|e| AuthError::from_backend(e, AuthError::DELETE_FAILED))?;

        self.update_files(user_id, AuthError::DELETE_FAILED, |doc| {
            doc.remove_file(file_id);
        })
        .await?;

        tracing::info!("File deleted");
        Ok(())
    }

    pub async fn get_all_files(&self, user_id: &str) -> Result<Vec<FileMetadata>> {
        Ok(self
            .require_profile(user_id, AuthError::LIST_FAILED)
            .await?
            .files)
    }

    pub async fn get_file_by_id(&self, file_id: &str, user_id: &str) -> Result<FileMetadata> {
        self.require_profile(user_id, AuthError::GET_FAILED)
            .await?
            .file_by_id(file_id)
            .cloned()
            .ok_or_else(|| AuthError::not_found(AuthError::FILE_NOT_FOUND))
    }

    /// First file with this display name.
    pub async fn get_file_by_name(&self, name: &str, user_id: &str) -> Result<FileMetadata> {
        self.require_profile(user_id, AuthError::GET_FAILED)
            .await?
            .file_by_name(name)
            .cloned()
            .ok_or_else(|| AuthError::not_found(AuthError::FILE_NOT_FOUND))
    }

    /// Every file with this display name, oldest first.
    pub async fn get_files_by_name(&self, name: &str, user_id: &str) -> Result<Vec<FileMetadata>> {
        Ok(self
            .require_profile(user_id, AuthError::GET_FAILED)
            .await?
            .files_by_name(name)
            .cloned()
            .collect())
    }
}
