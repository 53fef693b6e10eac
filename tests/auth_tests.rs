mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{PASSWORD, create_test_app};
use serde_json::json;

#[tokio::test]
async fn test_login_success_returns_token_and_profile() {
    let app = create_test_app().await;
    let id = app.create_user("alice", "alice@mail.com", true).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/auth",
            None,
            Some(json!({ "email": "alice@mail.com", "password": PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["username"], "alice");
    assert!(body["avatar"].is_null());
    let token = body["token"].as_str().unwrap();
    assert_eq!(token.len(), 32);
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(app.token_count(id).await, 1);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = create_test_app().await;
    let id = app.create_user("alice", "alice@mail.com", true).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/auth",
            None,
            Some(json!({ "email": "alice@mail.com", "password": "Wr0ngpass" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Incorrect credentials");
    assert_eq!(body["path"], "/api/auth");
    assert!(body["timestamp"].as_i64().unwrap() > 0);
    assert!(body["validationErrors"].as_object().unwrap().is_empty());
    assert_eq!(app.token_count(id).await, 0);
}

#[tokio::test]
async fn test_login_unknown_and_invalid_email() {
    let app = create_test_app().await;

    for email in ["nobody@mail.com", "not-an-email", ""] {
        let (status, body) = app
            .request(
                "POST",
                "/api/auth",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "email: {email:?}");
        assert_eq!(body["message"], "Incorrect credentials");
    }
}

#[tokio::test]
async fn test_login_inactive_account() {
    let app = create_test_app().await;
    let id = app.create_user("alice", "alice@mail.com", false).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/auth",
            None,
            Some(json!({ "email": "alice@mail.com", "password": PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Account is inactive");
    assert_eq!(app.token_count(id).await, 0);
}

#[tokio::test]
async fn test_login_failure_localized() {
    let app = create_test_app().await;

    let (status, body) = app
        .request_with_lang(
            "POST",
            "/api/auth",
            None,
            Some(json!({ "email": "nobody@mail.com", "password": PASSWORD })),
            Some("pt-BR"),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Credenciais incorretas");
}

#[tokio::test]
async fn test_logout_without_token() {
    let app = create_test_app().await;

    let (status, body) = app.request("POST", "/api/auth/logout", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "You are not authenticated");
}

#[tokio::test]
async fn test_login_unreadable_body() {
    let app = create_test_app().await;
    app.create_user("alice", "alice@mail.com", true).await;

    let (status, body) = app.request_raw("POST", "/api/auth", None, "{not json").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Incorrect credentials");
    assert_eq!(body["path"], "/api/auth");
    assert!(body["timestamp"].is_i64());
    assert_eq!(body["validationErrors"], json!({}));

    // Wrong field types are no better than broken JSON.
    let (status, body) = app
        .request_raw("POST", "/api/auth", None, r#"{"email": 42}"#)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Incorrect credentials");

    // No body and no content type.
    let (status, body) = app.request("POST", "/api/auth", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Incorrect credentials");
    assert_eq!(body["path"], "/api/auth");
}

#[tokio::test]
async fn test_logout_with_unknown_or_expired_token() {
    let app = create_test_app().await;
    let id = app.create_user("alice", "alice@mail.com", true).await;
    let token = app.login("alice@mail.com").await;

    let (status, body) = app
        .request("POST", "/api/auth/logout", Some("never-issued"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "You are not authenticated");

    app.age_token(&token, Duration::from_secs(8 * 24 * 60 * 60)).await;
    let (status, body) = app
        .request("POST", "/api/auth/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "You are not authenticated");
    assert_eq!(body["path"], "/api/auth/logout");

    // The expired row is left for the cleanup sweep.
    assert_eq!(app.token_count(id).await, 1);
}
