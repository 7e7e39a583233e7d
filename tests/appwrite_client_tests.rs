// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Appwrite REST client against a mock server.

use filevault::backend::{
    AppwriteClient, BackendError, BlobStore, DocumentStore, IdentityService,
};
use filevault::config::Config;
use filevault::error::ErrorKind;
use filevault::models::{FileUpload, OAuthCallback};
use filevault::services::SessionGateway;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, api_key: Option<&str>) -> AppwriteClient {
    AppwriteClient::new(
        format!("{}/v1", server.uri()),
        "test-project",
        api_key.map(str::to_string),
    )
    .unwrap()
}

fn session_json() -> serde_json::Value {
    json!({
        "$id": "session-1",
        "userId": "user-1",
        "providerUid": "ada@example.com",
        "secret": "session-secret",
        "expire": "2027-01-01T00:00:00.000+00:00"
    })
}

fn account_json() -> serde_json::Value {
    json!({
        "$id": "user-1",
        "email": "ada@example.com",
        "name": "Ada",
        "prefs": {}
    })
}

fn profile_json(revision: &str) -> serde_json::Value {
    json!({
        "$id": "user-1",
        "$collectionId": "profiles",
        "$databaseId": "test-db",
        "$updatedAt": revision,
        "userId": "user-1",
        "email": "ada@example.com",
        "name": "Ada",
        "createdAt": "2026-01-01T00:00:00.000Z",
        "files": []
    })
}

#[tokio::test]
async fn test_create_email_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/account/sessions/email"))
        .and(header("X-Appwrite-Project", "test-project"))
        .and(header("X-Appwrite-Key", "server-key"))
        .and(body_json(json!({
            "email": "ada@example.com",
            "password": "correct-horse"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(session_json()))
        .expect(1)
        .mount(&server)
        .await;

    let session = client(&server, Some("server-key"))
        .create_email_session("ada@example.com", "correct-horse")
        .await
        .unwrap();

    assert_eq!(session.id, "session-1");
    assert_eq!(session.user_id, "user-1");
    assert_eq!(session.secret, "session-secret");
}

#[tokio::test]
async fn test_error_body_is_parsed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/account/sessions/email"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Invalid credentials. Please check the email and password.",
            "code": 401,
            "type": "user_invalid_credentials",
            "version": "1.6.0"
        })))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .create_email_session("ada@example.com", "wrong")
        .await
        .unwrap_err();

    match err {
        BackendError::Api {
            status,
            kind,
            message,
        } => {
            assert_eq!(status, 401);
            assert_eq!(kind, "user_invalid_credentials");
            assert!(message.starts_with("Invalid credentials"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_get_account_uses_session_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/account"))
        .and(header("X-Appwrite-Session", "session-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account_json()))
        .mount(&server)
        .await;

    let user = client(&server, None)
        .get_account("session-secret")
        .await
        .unwrap();
    assert_eq!(user.id, "user-1");
    assert_eq!(user.display_name(), "Ada");
}

#[tokio::test]
async fn test_create_account() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/account"))
        .and(body_json(json!({
            "userId": "user-1",
            "email": "ada@example.com",
            "password": "correct-horse",
            "name": "Ada"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(account_json()))
        .expect(1)
        .mount(&server)
        .await;

    let user = client(&server, None)
        .create_account("user-1", "ada@example.com", "correct-horse", "Ada")
        .await
        .unwrap();
    assert_eq!(user.email, "ada@example.com");
}

#[tokio::test]
async fn test_create_document_wraps_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/test-db/collections/profiles/documents"))
        .and(header("X-Appwrite-Key", "server-key"))
        .and(body_json(json!({
            "documentId": "user-1",
            "data": { "files": [] }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(profile_json("rev-1")))
        .expect(1)
        .mount(&server)
        .await;

    let doc = client(&server, Some("server-key"))
        .create_document("test-db", "profiles", "user-1", &json!({ "files": [] }))
        .await
        .unwrap();
    assert_eq!(doc.id, "user-1");
    assert_eq!(doc.revision, "rev-1");
}

#[tokio::test]
async fn test_update_with_matching_revision() {
    let server = MockServer::start().await;
    let doc_path = "/v1/databases/test-db/collections/profiles/documents/user-1";

    Mock::given(method("GET"))
        .and(path(doc_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("rev-1")))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(doc_path))
        .and(body_json(json!({ "data": { "files": [] } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("rev-2")))
        .expect(1)
        .mount(&server)
        .await;

    let doc = client(&server, None)
        .update_document(
            "test-db",
            "profiles",
            "user-1",
            &json!({ "files": [] }),
            Some("rev-1"),
        )
        .await
        .unwrap();
    assert_eq!(doc.revision, "rev-2");
}

#[tokio::test]
async fn test_update_with_stale_revision_conflicts() {
    let server = MockServer::start().await;
    let doc_path = "/v1/databases/test-db/collections/profiles/documents/user-1";

    Mock::given(method("GET"))
        .and(path(doc_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("rev-2")))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(doc_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("rev-3")))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server, None)
        .update_document(
            "test-db",
            "profiles",
            "user-1",
            &json!({ "files": [] }),
            Some("rev-1"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Conflict));
}

#[tokio::test]
async fn test_small_upload_is_single_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/storage/buckets/uploads/files"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "$id": "file-1",
            "bucketId": "uploads",
            "name": "notes.txt",
            "mimeType": "text/plain",
            "sizeOriginal": 5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let upload = FileUpload::new("notes.txt", "text/plain", b"hello".to_vec());
    let descriptor = client(&server, None)
        .create_file("uploads", "file-1", &upload)
        .await
        .unwrap();
    assert_eq!(descriptor.id, "file-1");
    assert_eq!(descriptor.size_original, 5);
}

#[tokio::test]
async fn test_large_upload_is_chunked() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/storage/buckets/uploads/files"))
        .and(header_exists("content-range"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "$id": "file-1",
            "bucketId": "uploads",
            "name": "big.bin",
            "mimeType": "application/octet-stream",
            "sizeOriginal": 6291456
        })))
        .expect(2)
        .mount(&server)
        .await;

    let upload = FileUpload::new("big.bin", "application/octet-stream", vec![0u8; 6 * 1024 * 1024]);
    let descriptor = client(&server, None)
        .create_file("uploads", "file-1", &upload)
        .await
        .unwrap();
    assert_eq!(descriptor.size_original, 6 * 1024 * 1024);
}

#[tokio::test]
async fn test_delete_missing_file() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/storage/buckets/uploads/files/file-1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "The requested file could not be found.",
            "code": 404,
            "type": "storage_file_not_found"
        })))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .delete_file("uploads", "file-1")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_gateway_login_over_rest() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/account/sessions/email"))
        .respond_with(ResponseTemplate::new(201).set_body_json(session_json()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/account"))
        .and(header("X-Appwrite-Session", "session-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account_json()))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/account/sessions/current"))
        .and(header("X-Appwrite-Session", "session-secret"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = SessionGateway::with_backend(
        Arc::new(client(&server, Some("server-key"))),
        (&Config::test_default()).into(),
    );

    let result = gateway
        .login("ada@example.com", "correct-horse")
        .await
        .unwrap();
    assert_eq!(result.session_id, "session-1");

    let user = gateway.get_current_user().await.unwrap();
    assert_eq!(user.email, "ada@example.com");

    gateway.logout().await.unwrap();
    assert!(gateway.session_secret().await.is_none());
}

#[tokio::test]
async fn test_gateway_maps_backend_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/account/sessions/email"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Invalid credentials. Please check the email and password.",
            "type": "user_invalid_credentials"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/account"))
        .respond_with(ResponseTemplate::new(500).set_body_string(""))
        .mount(&server)
        .await;

    let gateway = SessionGateway::with_backend(
        Arc::new(client(&server, None)),
        (&Config::test_default()).into(),
    );

    let err = gateway
        .login("ada@example.com", "wrong-password")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(err.message().starts_with("Invalid credentials"));

    // No message from the backend: the operation's fallback is used.
    let err = gateway
        .signup("ada@example.com", "correct-horse", "Ada")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert_eq!(err.message(), "Signup failed");
}

#[tokio::test]
async fn test_unreachable_backend_is_network_failure() {
    let client = AppwriteClient::new("http://127.0.0.1:1/v1", "test-project", None).unwrap();
    let gateway =
        SessionGateway::with_backend(Arc::new(client), (&Config::test_default()).into());

    let err = gateway
        .login("ada@example.com", "correct-horse")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkFailure);
    assert!(gateway.get_current_user().await.is_none());
}

fn secretless_session_json() -> serde_json::Value {
    let mut session = session_json();
    session["secret"] = json!("");
    session
}

#[tokio::test]
async fn test_login_without_session_secret_fails() {
    let server = MockServer::start().await;

    // Without a server key Appwrite creates the session but blanks its secret.
    Mock::given(method("POST"))
        .and(path("/v1/account/sessions/email"))
        .respond_with(ResponseTemplate::new(201).set_body_json(secretless_session_json()))
        .mount(&server)
        .await;

    let gateway = SessionGateway::with_backend(
        Arc::new(client(&server, None)),
        (&Config::test_default()).into(),
    );

    let err = gateway
        .login("ada@example.com", "correct-horse")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.message(), "Login failed");
    assert!(gateway.session_secret().await.is_none());
    assert!(gateway.get_current_user().await.is_none());
}

#[tokio::test]
async fn test_google_callback_without_session_secret_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/account/sessions/token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(secretless_session_json()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account_json()))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = SessionGateway::with_backend(
        Arc::new(client(&server, None)),
        (&Config::test_default()).into(),
    );

    let callback = OAuthCallback {
        user_id: Some("user-1".to_string()),
        secret: Some("token-secret".to_string()),
        error: None,
    };
    let err = gateway.complete_google_login(&callback).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.message(), "Google login failed");
    assert!(gateway.session_secret().await.is_none());
}

#[tokio::test]
async fn test_unreadable_profile_reports_read_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/databases/test-db/collections/profiles/documents/user-1"))
        .respond_with(ResponseTemplate::new(500).set_body_string(""))
        .mount(&server)
        .await;

    let gateway = SessionGateway::with_backend(
        Arc::new(client(&server, Some("server-key"))),
        (&Config::test_default()).into(),
    );

    let err = gateway.get_user_document("user-1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert_eq!(err.message(), "Failed to get user document");
}
