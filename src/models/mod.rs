// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod file;
pub mod forms;
pub mod profile;
pub mod user;

pub use file::{FileDescriptor, FileUpload};
pub use forms::{LoginForm, OAuthCallback, SignupForm};
pub use profile::{FileMetadata, StoredDocument, UserDocument};
pub use user::{LoginResult, Session, User, UserPrefs};
