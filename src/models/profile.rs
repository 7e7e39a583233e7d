// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user profile document and the file metadata nested in it.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::time_utils::now_rfc3339;

/// Profile record stored in the profile collection, keyed by user ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    pub user_id: String,
    pub email: String,
    pub name: String,
    /// When the profile was first created
    pub created_at: String,
    /// Uploaded files, oldest first
    #[serde(default)]
    pub files: Vec<FileMetadata>,
}

impl UserDocument {
    /// Fresh profile with an empty file list.
    pub fn new(user_id: &str, email: &str, name: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            created_at: now_rfc3339(),
            files: Vec::new(),
        }
    }

    pub fn file_by_id(&self, file_id: &str) -> Option<&FileMetadata> {
        self.files.iter().find(|f| f.file_id == file_id)
    }

    /// First entry with this display name. Names are not unique.
    pub fn file_by_name(&self, name: &str) -> Option<&FileMetadata> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn files_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FileMetadata> {
        self.files.iter().filter(move |f| f.name == name)
    }

    /// Append an entry, replacing any previous entry with the same file ID.
    pub fn insert_file(&mut self, entry: FileMetadata) {
        self.files.retain(|f| f.file_id != entry.file_id);
        self.files.push(entry);
    }

    /// Returns whether an entry was removed.
    pub fn remove_file(&mut self, file_id: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.file_id != file_id);
        self.files.len() != before
    }
}

/// Metadata for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// Blob ID in the storage bucket
    pub file_id: String,
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// MIME type as reported by the uploader
    #[serde(rename = "type")]
    pub content_type: String,
    pub uploaded_at: String,
}

/// A document as held by the document service.
///
/// `revision` is the backend's `$updatedAt` stamp; it changes on every write
/// and is the precondition for optimistic updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$updatedAt", default)]
    pub revision: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl StoredDocument {
    /// Decode the user-defined attributes; system `$` fields are ignored.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let data: Map<String, Value> = self
            .data
            .iter()
            .filter(|(k, _)| !k.starts_with('$'))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        serde_json::from_value(Value::Object(data))
    }
}
