mod common;

use axum::http::StatusCode;
use common::{TestApp, create_test_app};
use serde_json::json;

const NEW_PASSWORD: &str = "N3wPassword";

async fn request_reset(app: &TestApp, email: &str) -> String {
    let (status, body) = app
        .request(
            "POST",
            "/api/password-reset",
            None,
            Some(json!({ "email": email })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "reset request failed: {body}");
    app.db
        .users()
        .get_by_email(email)
        .await
        .unwrap()
        .unwrap()
        .password_reset_token
        .unwrap()
}

#[tokio::test]
async fn test_request_reset_sends_mail() {
    let app = create_test_app().await;
    app.create_user("alice", "alice@mail.com", true).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/password-reset",
            None,
            Some(json!({ "email": "alice@mail.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Check your e-mail for resetting your password");

    let user = app
        .db
        .users()
        .get_by_email("alice@mail.com")
        .await
        .unwrap()
        .unwrap();
    let token = user.password_reset_token.unwrap();
    let mail = app.mailer.last().unwrap();
    assert_eq!(mail.subject, "Password Reset");
    assert!(mail.html.contains(&format!("/#/password-reset?reset={}", token)));
}

#[tokio::test]
async fn test_request_reset_errors() {
    let app = create_test_app().await;

    let (status, body) = app
        .request(
            "POST",
            "/api/password-reset",
            None,
            Some(json!({ "email": "not-an-email" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["validationErrors"]["email"], "E-mail is not valid");

    let (status, body) = app
        .request(
            "POST",
            "/api/password-reset",
            None,
            Some(json!({ "email": "nobody@mail.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "E-mail not in use");
}

#[tokio::test]
async fn test_request_reset_email_failure() {
    let app = create_test_app().await;
    app.create_user("alice", "alice@mail.com", true).await;
    app.mailer.set_failing(true);

    let (status, body) = app
        .request(
            "POST",
            "/api/password-reset",
            None,
            Some(json!({ "email": "alice@mail.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "E-mail failure");
}

#[tokio::test]
async fn test_reset_with_unknown_token() {
    let app = create_test_app().await;

    let (status, body) = app
        .request(
            "PUT",
            "/api/password-reset",
            None,
            Some(json!({ "password_reset_token": "nope", "password": NEW_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Please enter a valid password reset token");

    // The token is checked before the password.
    let (status, _) = app
        .request(
            "PUT",
            "/api/password-reset",
            None,
            Some(json!({ "password_reset_token": "nope", "password": "weak" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_reset_rejects_weak_password() {
    let app = create_test_app().await;
    app.create_user("alice", "alice@mail.com", true).await;
    let token = request_reset(&app, "alice@mail.com").await;

    let (status, body) = app
        .request(
            "PUT",
            "/api/password-reset",
            None,
            Some(json!({ "password_reset_token": token, "password": "lowercase" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["validationErrors"]["password"].is_string());
}

#[tokio::test]
async fn test_reset_updates_password_and_revokes_sessions() {
    let app = create_test_app().await;
    let id = app.create_user("alice", "alice@mail.com", false).await;
    app.db.users().set_active(id, true).await.unwrap();
    let session = app.login("alice@mail.com").await;
    app.db.users().set_active(id, false).await.unwrap();

    let token = request_reset(&app, "alice@mail.com").await;

    let (status, body) = app
        .request(
            "PUT",
            "/api/password-reset",
            None,
            Some(json!({ "password_reset_token": token, "password": NEW_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password updated");

    let user = app.db.users().get_by_id(id).await.unwrap().unwrap();
    assert!(user.is_active);
    assert!(user.password_reset_token.is_none());
    assert!(accountd::password::verify_password(NEW_PASSWORD, &user.password));

    // Sessions issued before the reset no longer work.
    assert_eq!(app.token_count(id).await, 0);
    assert!(app.tokens.verify(&session).await.is_err());

    // The reset token is single use.
    let (status, _) = app
        .request(
            "PUT",
            "/api/password-reset",
            None,
            Some(json!({ "password_reset_token": token, "password": NEW_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, login) = app
        .request(
            "POST",
            "/api/auth",
            None,
            Some(json!({ "email": "alice@mail.com", "password": NEW_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(login["token"].is_string());
}

#[tokio::test]
async fn test_reset_unreadable_body() {
    let app = create_test_app().await;

    let (status, body) = app
        .request_raw("PUT", "/api/password-reset", None, "{not json")
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Please enter a valid password reset token");
    assert_eq!(body["path"], "/api/password-reset");

    let (status, body) = app
        .request_raw("POST", "/api/password-reset", None, "{not json")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation Failure");
}

#[tokio::test]
async fn test_failed_reset_changes_nothing() {
    let app = create_test_app().await;
    let id = app.create_user("alice", "alice@mail.com", true).await;
    let session = app.login("alice@mail.com").await;
    let token = request_reset(&app, "alice@mail.com").await;
    let before = app.db.users().get_by_id(id).await.unwrap().unwrap();

    // The password update succeeds, then revoking sessions fails.
    app.fail_writes("DELETE", "tokens").await;

    let (status, body) = app
        .request(
            "PUT",
            "/api/password-reset",
            None,
            Some(json!({ "password_reset_token": token, "password": NEW_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");

    let after = app.db.users().get_by_id(id).await.unwrap().unwrap();
    assert_eq!(after.password, before.password);
    assert_eq!(after.password_reset_token.as_deref(), Some(token.as_str()));
    assert_eq!(app.tokens.verify(&session).await.unwrap(), id);
}
