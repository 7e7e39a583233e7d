// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File API routes. All of them run behind `require_session`.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AuthError, ErrorKind, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{FileDescriptor, FileMetadata, FileUpload};
use crate::AppState;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/files", get(list_files).post(upload_file))
        .route("/api/files/by-name/{name}", get(get_file_by_name))
        .route("/api/files/{id}", get(get_file).delete(delete_file))
        .route("/api/files/{id}/download", get(download_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    name: String,
}

#[derive(Debug, Deserialize)]
pub struct ByNameParams {
    /// Return every file with the name instead of the first
    #[serde(default)]
    all: bool,
}

/// List the caller's files.
async fn list_files(Extension(auth): Extension<AuthUser>) -> Result<Json<Vec<FileMetadata>>> {
    let files = auth.gateway.get_all_files(&auth.user.id).await?;
    Ok(Json(files))
}

/// Upload the request body as a file named by `?name=`.
async fn upload_file(
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<FileDescriptor>)> {
    let name = params.name.trim();
    if name.is_empty() {
        return Err(AuthError::new(ErrorKind::Validation, "File name is required"));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    let upload = FileUpload::new(name, content_type, body.to_vec());
    let descriptor = auth.gateway.upload_file(upload, &auth.user.id).await?;
    Ok((StatusCode::CREATED, Json(descriptor)))
}

async fn get_file(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<FileMetadata>> {
    let file = auth.gateway.get_file_by_id(&id, &auth.user.id).await?;
    Ok(Json(file))
}

async fn get_file_by_name(
    Extension(auth): Extension<AuthUser>,
    Path(name): Path<String>,
    Query(params): Query<ByNameParams>,
) -> Result<Response> {
    if params.all {
        let files = auth.gateway.get_files_by_name(&name, &auth.user.id).await?;
        return Ok(Json(files).into_response());
    }
    let file = auth.gateway.get_file_by_name(&name, &auth.user.id).await?;
    Ok(Json(file).into_response())
}

/// Delete one of the caller's files.
async fn delete_file(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    // Only files listed in the caller's profile may be touched.
    auth.gateway.get_file_by_id(&id, &auth.user.id).await?;
    auth.gateway.delete_file(&id, &auth.user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Redirect to the storage download URL.
async fn download_file(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Redirect> {
    auth.gateway.get_file_by_id(&id, &auth.user.id).await?;
    let url = auth.gateway.download_file(&id)?;
    Ok(Redirect::temporary(&url))
}
