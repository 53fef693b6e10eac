use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ApiError, JsonBody, ResultExt};
use super::validation::is_valid_email;
use crate::auth::RequireAuth;
use crate::db::Database;
use crate::i18n::Message;
use crate::password::verify_password_async;
use crate::tokens::TokenService;

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub tokens: TokenService,
}

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/", post(login))
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    id: i64,
    username: String,
    avatar: Option<String>,
    token: String,
}

async fn login(
    State(state): State<AuthState>,
    payload: Result<JsonBody<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let failure = || ApiError::Unauthorized(Message::AuthenticationFailure);
    let JsonBody(payload) = payload.map_err(|_| failure())?;

    let email = payload
        .email
        .filter(|e| is_valid_email(e))
        .ok_or_else(failure)?;
    let password = payload.password.ok_or_else(failure)?;

    let user = state
        .db
        .users()
        .get_by_email(&email)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(failure)?;

    let matches = verify_password_async(password, user.password.clone())
        .await
        .db_err("Failed to verify password")?;
    if !matches {
        return Err(failure());
    }

    if !user.is_active {
        return Err(ApiError::Forbidden(Message::InactiveAuthenticationFailure));
    }

    let token = state
        .tokens
        .issue(user.id)
        .await
        .db_err("Failed to issue session token")?;

    info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        id: user.id,
        username: user.username,
        avatar: user.avatar,
        token,
    }))
}

async fn logout(
    State(state): State<AuthState>,
    RequireAuth(auth): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    state
        .tokens
        .invalidate(&auth.token)
        .await
        .db_err("Failed to invalidate session token")?;

    Ok(StatusCode::OK)
}
