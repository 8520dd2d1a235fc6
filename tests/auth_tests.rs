//! # Authentication Integration Tests
//!
//! Protected routes must never reach their handler (or the backend operation) without a
//! credential the user service accepts.

mod common;

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use serde_json::{json, Value};
use tonic::Code;

use common::{bearer, gateway, FakeUserService, VALID_TOKEN};

const PROTECTED: [(&str, &str); 5] = [
    ("PUT", "/v1/users/update-role"),
    ("GET", "/v1/users/send-verify"),
    ("PUT", "/v1/users/add-editor?token=x"),
    ("PUT", "/v1/users/send-editor-invite/3"),
    ("GET", "/v1/users/me"),
];

#[tokio::test]
async fn test_missing_credential_is_rejected_before_any_call() {
    let fake = FakeUserService::new();
    let server = gateway(&fake);

    for (method, path) in PROTECTED {
        let response = match method {
            "GET" => server.get(path).await,
            _ => server.put(path).json(&json!({ "user_id": 1, "role_name": "x" })).await,
        };
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED, "{method} {path}");
        assert_eq!(response.json::<Value>(), json!({ "message": "Unauthorized" }));
    }
    assert_eq!(fake.total_calls(), 0);
}

#[tokio::test]
async fn test_malformed_credentials_are_rejected() {
    let fake = FakeUserService::new();
    let server = gateway(&fake);

    for value in ["token-abc", "Basic token-abc", "Bearer", "Bearer token-abc extra"] {
        let response = server
            .get("/v1/users/send-verify")
            .add_header(AUTHORIZATION, HeaderValue::from_static(value))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED, "{value:?}");
    }
    assert_eq!(fake.total_calls(), 0);
}

#[tokio::test]
async fn test_scheme_is_case_insensitive() {
    let fake = FakeUserService::new();
    let server = gateway(&fake);

    let response = server
        .get("/v1/users/me")
        .add_header(AUTHORIZATION, HeaderValue::from_static("bearer token-abc"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_rejected_credential_is_unauthorized() {
    let fake = FakeUserService::new();
    let server = gateway(&fake);

    let response = server
        .get("/v1/users/send-verify")
        .add_header(AUTHORIZATION, bearer("forged"))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>(), json!({ "message": "Unauthorized" }));
    assert_eq!(fake.calls("AuthUser"), 1);
    assert_eq!(fake.calls("SendVerificationUser"), 0);
}

#[tokio::test]
async fn test_credential_for_missing_user_is_not_found() {
    let fake = FakeUserService::new();
    fake.fail("AuthUser", Code::NotFound, "data not found");
    let server = gateway(&fake);

    let response = server
        .get("/v1/users/send-verify")
        .add_header(AUTHORIZATION, bearer(VALID_TOKEN))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(fake.calls("SendVerificationUser"), 0);
}

#[tokio::test]
async fn test_unreachable_backend_during_auth_is_internal() {
    let fake = FakeUserService::new();
    fake.fail("AuthUser", Code::Unavailable, "connection refused");
    let server = gateway(&fake);

    let response = server
        .get("/v1/users/me")
        .add_header(AUTHORIZATION, bearer(VALID_TOKEN))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>(), json!({ "message": "Internal server error" }));
}

#[tokio::test]
async fn test_handler_sees_exact_identity() {
    let fake = FakeUserService::new();
    let server = gateway(&fake);

    let response = server
        .get("/v1/users/me")
        .add_header(AUTHORIZATION, bearer(VALID_TOKEN))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({
            "user_id": 7,
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "is_verified": true,
            "role": "admin"
        })
    );

    let response = server
        .get("/v1/users/send-verify")
        .add_header(AUTHORIZATION, bearer(VALID_TOKEN))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(fake.last_current_user(), Some(fake.identity.clone()));
}

#[tokio::test]
async fn test_identity_is_resolved_on_every_request() {
    let fake = FakeUserService::new();
    let server = gateway(&fake);

    for _ in 0..3 {
        server
            .get("/v1/users/me")
            .add_header(AUTHORIZATION, bearer(VALID_TOKEN))
            .await
            .assert_status_ok();
    }
    assert_eq!(fake.calls("AuthUser"), 3);
}
