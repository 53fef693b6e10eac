use axum::{Router, extract::State, response::IntoResponse, routing::post};
use serde::Deserialize;
use tracing::{info, warn};

use super::error::{ApiError, JsonBody, MessageResponse, ResultExt, ValidationErrors};
use super::validation::{check_email, check_password};
use crate::db::{Database, UserStore};
use crate::email::EmailService;
use crate::i18n::{Lang, Message};
use crate::password::hash_password_async;
use crate::tokens::{TokenService, random_string};

const RESET_TOKEN_LENGTH: usize = 16;

#[derive(Clone)]
pub struct PasswordResetState {
    pub db: Database,
    pub tokens: TokenService,
    pub email: EmailService,
}

pub fn router(state: PasswordResetState) -> Router {
    Router::new()
        .route("/", post(request_reset).put(reset_password))
        .with_state(state)
}

#[derive(Deserialize)]
struct ResetRequest {
    email: Option<String>,
}

async fn request_reset(
    State(state): State<PasswordResetState>,
    lang: Lang,
    JsonBody(payload): JsonBody<ResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = match check_email(payload.email.as_deref()) {
        Ok(()) => payload.email.unwrap_or_default(),
        Err(message) => {
            let mut errors = ValidationErrors::new();
            errors.insert("email", message);
            return Err(ApiError::Validation(errors));
        }
    };

    let user = state
        .db
        .users()
        .get_by_email(&email)
        .await
        .db_err("Failed to look up user")?
        .ok_or(ApiError::NotFound(Message::EmailNotInUse))?;

    let token = random_string(RESET_TOKEN_LENGTH);
    state
        .db
        .users()
        .set_password_reset_token(user.id, &token)
        .await
        .db_err("Failed to store reset token")?;

    if let Err(e) = state.email.send_password_reset(&email, &token).await {
        warn!(user_id = user.id, error = %e, "Password reset email failed");
        return Err(ApiError::BadGateway(Message::EmailFailure));
    }

    Ok(MessageResponse::new(Message::PasswordResetRequestSuccess, lang))
}

#[derive(Deserialize)]
struct ResetPassword {
    #[serde(alias = "passwordResetToken")]
    password_reset_token: Option<String>,
    password: Option<String>,
}

async fn reset_password(
    State(state): State<PasswordResetState>,
    lang: Lang,
    payload: Result<JsonBody<ResetPassword>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let forbidden = ApiError::Forbidden(Message::UnauthorizedPasswordReset);
    // An unreadable body carries no reset token.
    let Ok(JsonBody(payload)) = payload else {
        return Err(forbidden);
    };
    let Some(token) = payload.password_reset_token.filter(|t| !t.is_empty()) else {
        return Err(forbidden);
    };

    let user = state
        .db
        .users()
        .get_by_password_reset_token(&token)
        .await
        .db_err("Failed to look up reset token")?
        .ok_or(forbidden)?;

    if let Err(message) = check_password(payload.password.as_deref()) {
        let mut errors = ValidationErrors::new();
        errors.insert("password", message);
        return Err(ApiError::Validation(errors));
    }
    let password = payload.password.unwrap_or_default();

    let password_hash = hash_password_async(password)
        .await
        .db_err("Failed to hash password")?;

    let mut tx = state.db.begin().await.db_err("Failed to start transaction")?;
    UserStore::reset_password_in(&mut tx, user.id, &password_hash)
        .await
        .db_err("Failed to update password")?;
    let revoked = state
        .tokens
        .invalidate_all_in(&mut tx, user.id)
        .await
        .db_err("Failed to invalidate sessions")?;
    tx.commit().await.db_err("Failed to update password")?;

    info!(user_id = user.id, revoked, "Password reset");
    Ok(MessageResponse::new(Message::PasswordResetSuccess, lang))
}
