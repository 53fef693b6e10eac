#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use accountd::db::{Database, NewUser};
use accountd::email::{MailError, Mailer, OutgoingMail};
use accountd::password::hash_password;
use accountd::tokens::{DEFAULT_EXPIRY_WINDOW, TokenService, now_millis};
use accountd::{ServerConfig, create_app};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use futures::future::BoxFuture;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "P4ssword";

/// Mailer that keeps every message and can be switched to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<OutgoingMail> {
        self.sent.lock().unwrap().last().cloned()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, mail: OutgoingMail) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(MailError::Rejected("test mailer is failing".to_string()));
            }
            self.sent.lock().unwrap().push(mail);
            Ok(())
        })
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub tokens: TokenService,
    pub mailer: Arc<RecordingMailer>,
    pub upload_dir: TempDir,
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with_window(DEFAULT_EXPIRY_WINDOW).await
}

pub async fn create_test_app_with_window(window: Duration) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");
    let mailer = Arc::new(RecordingMailer::default());

    let config = ServerConfig {
        db: db.clone(),
        session_window: window,
        cleanup_interval: Duration::from_secs(3600),
        mailer: mailer.clone(),
        upload_dir: upload_dir.path().to_path_buf(),
        client_origin: "http://localhost:8080".to_string(),
    };
    config
        .avatar_storage()
        .create_folders()
        .await
        .expect("Failed to create upload folders");

    TestApp {
        app: create_app(&config),
        tokens: config.token_service(),
        db,
        mailer,
        upload_dir,
    }
}

impl TestApp {
    /// Send a request and decode the JSON body (`Null` when empty).
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.request_with_lang(method, uri, token, body, None).await
    }

    pub async fn request_with_lang(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        lang: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(lang) = lang {
            builder = builder.header(header::ACCEPT_LANGUAGE, lang);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    /// Send `body` verbatim as `application/json`.
    pub async fn request_raw(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: &str,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Insert a user directly, bypassing registration.
    pub async fn create_user(&self, username: &str, email: &str, active: bool) -> i64 {
        let digest = hash_password(PASSWORD).unwrap();
        let id = self
            .db
            .users()
            .create(&NewUser {
                username,
                email,
                password_hash: &digest,
                activation_token: None,
            })
            .await
            .unwrap();
        if active {
            self.db.users().set_active(id, true).await.unwrap();
        }
        id
    }

    /// Log in through the API and return the bearer token.
    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/api/auth",
                None,
                Some(serde_json::json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Pretend the token was last used `age` ago.
    pub async fn age_token(&self, token: &str, age: Duration) {
        sqlx::query("UPDATE tokens SET last_used_at = ? WHERE token = ?")
            .bind(now_millis() - age.as_millis() as i64)
            .bind(token)
            .execute(self.db.pool())
            .await
            .unwrap();
    }

    pub async fn token_count(&self, user_id: i64) -> usize {
        self.db.tokens().list_by_user(user_id).await.unwrap().len()
    }

    /// Make every `op` (INSERT, UPDATE or DELETE) on `table` abort.
    pub async fn fail_writes(&self, op: &str, table: &str) {
        let sql = format!(
            "CREATE TRIGGER fail_{op}_{table} BEFORE {op} ON {table} \
             BEGIN SELECT RAISE(ABORT, 'write refused'); END"
        );
        sqlx::query(&sql).execute(self.db.pool()).await.unwrap();
    }
}
