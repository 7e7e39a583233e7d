// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account and session models as returned by the identity service.

use serde::{Deserialize, Serialize};

/// An authenticated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Account ID (also the profile document ID)
    #[serde(rename = "$id")]
    pub id: String,
    pub email: String,
    /// Display name chosen at signup or supplied by the OAuth provider
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prefs: UserPrefs,
}

/// Free-form account preferences; only the fields we read are modelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPrefs {
    /// Profile picture URL (set by Google OAuth)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl User {
    /// Name shown in the UI: the account name, or the local part of the email.
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if !name.is_empty() {
            return name;
        }
        self.email.split('@').next().unwrap_or(&self.email)
    }

    /// Single upper-case letter shown when there is no picture.
    pub fn avatar_fallback(&self) -> String {
        self.display_name()
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.prefs.picture.as_deref().filter(|p| !p.is_empty())
    }
}

/// A backend-issued session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    pub user_id: String,
    /// Provider-side identity; the email address for email sessions
    #[serde(default)]
    pub provider_uid: String,
    /// Credential for subsequent calls. Only returned to server-key callers.
    #[serde(default)]
    pub secret: String,
    /// Expiry timestamp (ISO 8601)
    #[serde(default)]
    pub expire: String,
}

/// Result of a successful email/password login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResult {
    pub user_id: String,
    pub email: String,
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, email: &str) -> User {
        User {
            id: "u1".to_string(),
            email: email.to_string(),
            name: name.to_string(),
            prefs: UserPrefs::default(),
        }
    }

    #[test]
    fn test_display_name_prefers_name() {
        let u = user("Ada Lovelace", "ada@example.com");
        assert_eq!(u.display_name(), "Ada Lovelace");
        assert_eq!(u.avatar_fallback(), "A");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let u = user("  ", "grace@example.com");
        assert_eq!(u.display_name(), "grace");
        assert_eq!(u.avatar_fallback(), "G");
    }

    #[test]
    fn test_deserialize_account() {
        let json = r#"{
            "$id": "abc",
            "$createdAt": "2024-12-18T10:00:00.000+00:00",
            "email": "x@example.com",
            "name": "X",
            "prefs": {"picture": "https://example.com/x.png", "theme": "dark"}
        }"#;
        let u: User = serde_json::from_str(json).unwrap();
        assert_eq!(u.id, "abc");
        assert_eq!(u.avatar_url(), Some("https://example.com/x.png"));
    }
}
