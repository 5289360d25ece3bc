//! Integration tests for the authentication transport
//!
//! These tests use wiremock to stand in for the marketplace backend and
//! exercise the full request/response cycle, the bearer header, and the 401
//! interceptor.

use api_client::http::{ApiRequest, ApiResponse};
use api_client::types::{ImageUpload, RegistrationImages};
use api_client::{
    ApiClientConfig, AuthService, Credential, CredentialStore, Error, LoginCredentials,
    RegistrationData, Role,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storage::{KvError, MemoryStore, SecureStore};
use wiremock::matchers::{body_json, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct ReadOnlyStore;

impl SecureStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> storage::kv::Result<Option<String>> {
        Ok(None)
    }

    fn set_many(&self, _entries: &[(&str, &str)]) -> storage::kv::Result<()> {
        Err(KvError::Unavailable("read-only".to_string()))
    }

    fn remove_many(&self, _keys: &[&str]) -> storage::kv::Result<usize> {
        Ok(0)
    }
}

fn service(server: &MockServer) -> (AuthService, CredentialStore) {
    let credentials = CredentialStore::new(MemoryStore::new());
    let auth = AuthService::new(ApiClientConfig::new(server.uri()), credentials.clone()).unwrap();
    (auth, credentials)
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_success_persists_and_sets_bearer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(serde_json::json!({"email": "a@b.com", "password": "secret12"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"token": "abc", "role": "USER"})),
        )
        .mount(&mock_server)
        .await;

    let (auth, credentials) = service(&mock_server);

    let credential = auth.login(&LoginCredentials::new("a@b.com", "secret12")).await.unwrap();

    assert_eq!(credential, Credential::new("abc", Role::User));
    assert_eq!(credentials.get_token(), Some("abc".to_string()));
    assert_eq!(credentials.get_role(), Some(Role::User));
    assert_eq!(auth.client().auth_token(), Some("abc".to_string()));
}

#[tokio::test]
async fn test_bearer_header_attached_after_login() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"token": "abc", "role": "USER"})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gems"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (auth, _) = service(&mock_server);
    auth.login(&LoginCredentials::new("a@b.com", "secret12")).await.unwrap();

    let response: ApiResponse<Vec<serde_json::Value>> =
        auth.client().send(ApiRequest::get("/gems")).await.unwrap();
    assert!(response.data.is_empty());
}

#[tokio::test]
async fn test_login_rejected_passes_backend_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"message": "Invalid email or password"})),
        )
        .mount(&mock_server)
        .await;

    let (auth, credentials) = service(&mock_server);

    let err = auth.login(&LoginCredentials::new("a@b.com", "wrong")).await.unwrap_err();

    assert!(matches!(err, Error::Auth { status: 400, .. }));
    assert_eq!(err.user_message(), "Invalid email or password");
    assert_eq!(credentials.get_token(), None);
    assert_eq!(auth.client().auth_token(), None);
}

#[tokio::test]
async fn test_login_unreachable_is_network_error() {
    let credentials = CredentialStore::new(MemoryStore::new());
    let auth = AuthService::new(
        ApiClientConfig::new("http://127.0.0.1:9").with_timeout(Duration::from_secs(2)),
        credentials,
    )
    .unwrap();

    let err = auth.login(&LoginCredentials::new("a@b.com", "secret12")).await.unwrap_err();

    assert!(matches!(err, Error::Network(_)));
    assert!(err.user_message().contains("check your connection"));
}

#[tokio::test]
async fn test_login_timeout_is_network_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"token": "abc", "role": "USER"}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let credentials = CredentialStore::new(MemoryStore::new());
    let auth = AuthService::new(
        ApiClientConfig::new(mock_server.uri()).with_timeout(Duration::from_millis(50)),
        credentials.clone(),
    )
    .unwrap();

    let err = auth.login(&LoginCredentials::new("a@b.com", "secret12")).await.unwrap_err();

    assert!(matches!(err, Error::Network(_)));
    assert_eq!(credentials.get_token(), None);
}

#[tokio::test]
async fn test_login_storage_failure_aborts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"token": "abc", "role": "USER"})),
        )
        .mount(&mock_server)
        .await;

    let auth = AuthService::new(
        ApiClientConfig::new(mock_server.uri()),
        CredentialStore::new(ReadOnlyStore),
    )
    .unwrap();

    let err = auth.login(&LoginCredentials::new("a@b.com", "secret12")).await.unwrap_err();

    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(auth.client().auth_token(), None);
}

// =============================================================================
// 401 interceptor
// =============================================================================

#[tokio::test]
async fn test_unauthorized_response_clears_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bids"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "jwt expired"})),
        )
        .mount(&mock_server)
        .await;

    let (auth, credentials) = service(&mock_server);
    credentials.store_credential(&Credential::new("stale", Role::User)).unwrap();
    auth.restore(&Credential::new("stale", Role::User));

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    auth.client().on_unauthorized(Arc::new(move |_| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    }));

    let result: Result<ApiResponse<serde_json::Value>, _> =
        auth.client().send(ApiRequest::get("/bids")).await;

    let err = result.unwrap_err();
    assert_eq!(err.status(), 401);
    assert_eq!(err.message(), "jwt expired");
    assert_eq!(credentials.get_token(), None);
    assert_eq!(credentials.get_role(), None);
    assert_eq!(auth.client().auth_token(), None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_non_401_error_keeps_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bids"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let (auth, credentials) = service(&mock_server);
    credentials.store_credential(&Credential::new("abc", Role::User)).unwrap();
    auth.restore(&Credential::new("abc", Role::User));

    let result: Result<ApiResponse<serde_json::Value>, _> =
        auth.client().send(ApiRequest::get("/bids")).await;

    assert_eq!(result.unwrap_err().status(), 403);
    assert_eq!(credentials.get_token(), Some("abc".to_string()));
    assert_eq!(auth.client().auth_token(), Some("abc".to_string()));
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({
            "name": "Ada",
            "email": "ada@example.com",
            "password": "secret12",
            "contactNumber": "5550100"
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "message": "Registered",
                "token": "new-token",
                "role": "USER"
            })),
        )
        .mount(&mock_server)
        .await;

    let (auth, credentials) = service(&mock_server);
    let data = RegistrationData::new("Ada", "ada@example.com", "secret12", "5550100");

    let credential = auth.register(&data).await.unwrap();

    assert_eq!(credential.token, "new-token");
    assert_eq!(credentials.get_token(), Some("new-token".to_string()));
}

#[tokio::test]
async fn test_register_multipart_with_images() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(serde_json::json!({"token": "kyc-token", "role": "USER"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (auth, _) = service(&mock_server);
    let data = RegistrationData::new("Ada", "ada@example.com", "secret12", "5550100").with_images(
        RegistrationImages {
            id_front: ImageUpload::jpeg("front.jpg", vec![0xFF, 0xD8, 0x01]),
            id_back: ImageUpload::jpeg("back.jpg", vec![0xFF, 0xD8, 0x02]),
            selfie: ImageUpload::jpeg("selfie.jpg", vec![0xFF, 0xD8, 0x03]),
        },
    );

    let credential = auth.register(&data).await.unwrap();

    assert_eq!(credential.token, "kyc-token");
    let received = mock_server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(body.contains("name=\"idFrontImage\""));
    assert!(body.contains("name=\"selfieImage\""));
    assert!(body.contains("name=\"contactNumber\""));
}

#[tokio::test]
async fn test_register_upload_uses_upload_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(serde_json::json!({"token": "kyc-token", "role": "USER"}))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&mock_server)
        .await;

    let auth = AuthService::new(
        ApiClientConfig::new(mock_server.uri())
            .with_timeout(Duration::from_millis(50))
            .with_upload_timeout(Duration::from_secs(5)),
        CredentialStore::new(MemoryStore::new()),
    )
    .unwrap();
    let plain = RegistrationData::new("Ada", "ada@example.com", "secret12", "5550100");
    let with_images = plain.clone().with_images(RegistrationImages {
        id_front: ImageUpload::jpeg("front.jpg", vec![0xFF, 0xD8, 0x01]),
        id_back: ImageUpload::jpeg("back.jpg", vec![0xFF, 0xD8, 0x02]),
        selfie: ImageUpload::jpeg("selfie.jpg", vec![0xFF, 0xD8, 0x03]),
    });

    let err = auth.register(&plain).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));

    let credential = auth.register(&with_images).await.unwrap();
    assert_eq!(credential.token, "kyc-token");
}

#[tokio::test]
async fn test_register_message_only_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Registration successful",
            "role": "USER"
        })))
        .mount(&mock_server)
        .await;

    let (auth, credentials) = service(&mock_server);
    let data = RegistrationData::new("Ada", "ada@example.com", "secret12", "5550100");

    let credential = auth.register(&data).await.unwrap();

    assert!(credential.token.starts_with("temp_token_"));
    assert_eq!(credentials.get_token(), Some(credential.token));
}

// =============================================================================
// Password reset
// =============================================================================

#[tokio::test]
async fn test_forgot_password() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/forgot-password"))
        .and(body_json(serde_json::json!({"email": "a@b.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "OTP sent",
            "email": "a@b.com"
        })))
        .mount(&mock_server)
        .await;

    let (auth, _) = service(&mock_server);

    let response = auth.forgot_password("a@b.com").await.unwrap();
    assert_eq!(response.message, "OTP sent");
    assert_eq!(response.email, Some("a@b.com".to_string()));
}

#[tokio::test]
async fn test_forgot_password_unknown_email() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/forgot-password"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"message": "User not found"})),
        )
        .mount(&mock_server)
        .await;

    let (auth, _) = service(&mock_server);

    let err = auth.forgot_password("nobody@b.com").await.unwrap_err();
    assert_eq!(err.user_message(), "User not found");
}

#[tokio::test]
async fn test_reset_password() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/reset-password"))
        .and(body_json(serde_json::json!({
            "email": "a@b.com",
            "otp": "123456",
            "newPassword": "newsecret1"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "Password reset"})),
        )
        .mount(&mock_server)
        .await;

    let (auth, _) = service(&mock_server);

    let response = auth.reset_password("a@b.com", "123456", "newsecret1").await.unwrap();
    assert_eq!(response.message, "Password reset");
}

#[tokio::test]
async fn test_reset_password_expired_otp() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/reset-password"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"message": "OTP expired"})),
        )
        .mount(&mock_server)
        .await;

    let (auth, _) = service(&mock_server);

    let err = auth.reset_password("a@b.com", "123456", "newsecret1").await.unwrap_err();
    assert!(matches!(err, Error::Auth { status: 400, .. }));
    assert_eq!(err.user_message(), "OTP expired");
}
