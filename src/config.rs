// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Every Appwrite identifier has a default matching the hosted project the
//! application was first deployed against, so a bare `cargo run` talks to it.

use std::env;

const DEFAULT_ENDPOINT: &str = "https://cloud.appwrite.io/v1";
const DEFAULT_PROJECT_ID: &str = "6763024d0038091d468c";
const DEFAULT_DATABASE_ID: &str = "6763029b0019f0ad0479";
const DEFAULT_COLLECTION_ID: &str = "676302b3000ed04f0489";
const DEFAULT_BUCKET_ID: &str = "676302de003e07ed0bbf";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

/// Which backend implementation serves the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Hosted Appwrite project over REST.
    Appwrite,
    /// In-process backend; state is lost on restart.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Appwrite REST endpoint, including the `/v1` suffix
    pub appwrite_endpoint: String,
    /// Appwrite project ID
    pub project_id: String,
    /// Database holding the profile collection
    pub database_id: String,
    /// Collection of per-user profile documents
    pub collection_id: String,
    /// Storage bucket for uploaded files
    pub bucket_id: String,
    /// Server API key, sent with document and storage calls when set
    pub api_key: Option<String>,
    /// Where the provider sends the browser after OAuth consent
    pub oauth_success_url: String,
    /// Where the provider sends the browser when consent fails
    pub oauth_failure_url: String,
    /// Public URL of the application (CORS origin, cookie security)
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Backend selection
    pub backend: BackendKind,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let frontend_url = env_or("FRONTEND_URL", DEFAULT_FRONTEND_URL);
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", raw))?,
            Err(_) => 3000,
        };
        let backend = match env::var("FILEVAULT_BACKEND") {
            Ok(raw) => parse_backend(&raw).ok_or(ConfigError::Invalid("FILEVAULT_BACKEND", raw))?,
            Err(_) => BackendKind::Appwrite,
        };
        // Appwrite withholds session secrets from clients without a server key.
        let api_key = env::var("APPWRITE_API_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if backend == BackendKind::Appwrite && api_key.is_none() {
            return Err(ConfigError::Missing("APPWRITE_API_KEY"));
        }

        Ok(Self {
            appwrite_endpoint: env_or("APPWRITE_ENDPOINT", DEFAULT_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            project_id: env_or("APPWRITE_PROJECT_ID", DEFAULT_PROJECT_ID),
            database_id: env_or("APPWRITE_DATABASE_ID", DEFAULT_DATABASE_ID),
            collection_id: env_or("APPWRITE_COLLECTION_ID", DEFAULT_COLLECTION_ID),
            bucket_id: env_or("APPWRITE_BUCKET_ID", DEFAULT_BUCKET_ID),
            api_key,
            oauth_success_url: env::var("OAUTH_SUCCESS_URL")
                .unwrap_or_else(|_| format!("{}/auth/google/callback", frontend_url)),
            oauth_failure_url: env::var("OAUTH_FAILURE_URL")
                .unwrap_or_else(|_| format!("{}/login", frontend_url)),
            frontend_url,
            port,
            backend,
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            appwrite_endpoint: "http://localhost:8081/v1".to_string(),
            project_id: "test-project".to_string(),
            database_id: "test-db".to_string(),
            collection_id: "profiles".to_string(),
            bucket_id: "uploads".to_string(),
            api_key: None,
            oauth_success_url: "http://localhost:3000/auth/google/callback".to_string(),
            oauth_failure_url: "http://localhost:3000/login".to_string(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            port: 3000,
            backend: BackendKind::Memory,
        }
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_backend(raw: &str) -> Option<BackendKind> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "appwrite" => Some(BackendKind::Appwrite),
        "memory" => Some(BackendKind::Memory),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1:?}")]
    Invalid(&'static str, String),
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
}
