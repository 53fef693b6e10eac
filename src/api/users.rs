use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{ApiError, JsonBody, MessageResponse, ResultExt, ValidationErrors};
use super::validation::{check_email, check_password, check_username};
use crate::auth::OptionalAuth;
use crate::db::{Database, NewUser, User, UserStore};
use crate::email::EmailService;
use crate::i18n::{Lang, Message};
use crate::password::hash_password_async;
use crate::storage::{AvatarStorage, MAX_AVATAR_BYTES, detect_image};
use crate::tokens::{TokenService, random_string};

const ACTIVATION_TOKEN_LENGTH: usize = 16;
const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 10;
const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;
/// Room for a base64 avatar just under the size cap plus the JSON around it.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub tokens: TokenService,
    pub email: EmailService,
    pub avatars: AvatarStorage,
}

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/token/{token}", post(activate_account))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Public view of a user.
#[derive(Debug, Serialize)]
struct UserView {
    id: i64,
    username: String,
    email: String,
    avatar: Option<String>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            avatar: user.avatar,
        }
    }
}

#[derive(Deserialize)]
struct CreateUserRequest {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

async fn create_user(
    State(state): State<UsersState>,
    lang: Lang,
    JsonBody(payload): JsonBody<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = ValidationErrors::new();

    if let Err(message) = check_username(payload.username.as_deref()) {
        errors.insert("username", message);
    }
    match check_email(payload.email.as_deref()) {
        Err(message) => {
            errors.insert("email", message);
        }
        Ok(()) => {
            let email = payload.email.as_deref().unwrap_or_default();
            let taken = state
                .db
                .users()
                .get_by_email(email)
                .await
                .db_err("Failed to check email")?
                .is_some();
            if taken {
                errors.insert("email", Message::EmailInUse);
            }
        }
    }
    if let Err(message) = check_password(payload.password.as_deref()) {
        errors.insert("password", message);
    }

    let (Some(username), Some(email), Some(password)) =
        (payload.username, payload.email, payload.password)
    else {
        return Err(ApiError::Validation(errors));
    };
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let password_hash = hash_password_async(password)
        .await
        .db_err("Failed to hash password")?;
    let activation_token = random_string(ACTIVATION_TOKEN_LENGTH);

    let created = state
        .db
        .users()
        .create(&NewUser {
            username: &username,
            email: &email,
            password_hash: &password_hash,
            activation_token: Some(&activation_token),
        })
        .await;

    let user_id = match created {
        Ok(id) => id,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            let mut errors = ValidationErrors::new();
            errors.insert("email", Message::EmailInUse);
            return Err(ApiError::Validation(errors));
        }
        Err(e) => return Err(ApiError::internal("Failed to create user", e)),
    };

    if let Err(e) = state
        .email
        .send_account_activation(&email, &activation_token)
        .await
    {
        warn!(user_id, error = %e, "Activation email failed, removing user");
        state
            .db
            .users()
            .delete(user_id)
            .await
            .db_err("Failed to remove user after email failure")?;
        return Err(ApiError::BadGateway(Message::EmailFailure));
    }

    info!(user_id, "User registered");
    Ok(MessageResponse::new(Message::UserCreateSuccess, lang))
}

async fn activate_account(
    State(state): State<UsersState>,
    lang: Lang,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let activated = state
        .db
        .users()
        .activate_by_token(&token)
        .await
        .db_err("Failed to activate account")?;

    if !activated {
        return Err(ApiError::BadRequest(Message::AccountActivationFailure));
    }
    Ok(MessageResponse::new(Message::AccountActivationSuccess, lang))
}

#[derive(Debug, Default, Deserialize)]
struct PageParams {
    page: Option<String>,
    size: Option<String>,
}

impl PageParams {
    /// Clamp to a non-negative page and a size in `1..=MAX_PAGE_SIZE`.
    ///
    /// The page is capped so that `page * size` stays within `i64`.
    fn resolve(&self) -> (i64, i64) {
        let page = self
            .page
            .as_deref()
            .and_then(|p| p.parse::<i64>().ok())
            .unwrap_or(0)
            .clamp(0, MAX_PAGE);
        let size = match self.size.as_deref().and_then(|s| s.parse::<i64>().ok()) {
            Some(s) if s >= 1 => s.min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        };
        (page, size)
    }
}

#[derive(Serialize)]
struct UserPage {
    content: Vec<UserView>,
    page: i64,
    size: i64,
    total_pages: i64,
}

async fn list_users(
    State(state): State<UsersState>,
    OptionalAuth(auth): OptionalAuth,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, size) = params.resolve();
    let exclude = auth.map(|a| a.user_id);

    let users = state.db.users();
    let total = users
        .count_active(exclude)
        .await
        .db_err("Failed to count users")?;
    let content = users
        .list_active(exclude, page, size)
        .await
        .db_err("Failed to list users")?
        .into_iter()
        .map(UserView::from)
        .collect();

    Ok(Json(UserPage {
        content,
        page,
        size,
        total_pages: (total + size - 1) / size,
    }))
}

async fn get_user(
    State(state): State<UsersState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .filter(|u| u.is_active)
        .ok_or(ApiError::NotFound(Message::UserNotFound))?;

    Ok(Json(UserView::from(user)))
}

#[derive(Debug, Deserialize)]
struct UpdateUserRequest {
    username: Option<String>,
    image: Option<String>,
}

/// Decode and check a base64 avatar.
fn decode_avatar(image: &str) -> Result<Vec<u8>, Message> {
    let bytes = STANDARD
        .decode(image.trim())
        .map_err(|_| Message::UnsupportedImageFile)?;
    if bytes.len() >= MAX_AVATAR_BYTES {
        return Err(Message::ProfileImageSize);
    }
    detect_image(&bytes).ok_or(Message::UnsupportedImageFile)?;
    Ok(bytes)
}

async fn update_user(
    State(state): State<UsersState>,
    OptionalAuth(auth): OptionalAuth,
    Path(id): Path<i64>,
    payload: Result<JsonBody<UpdateUserRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if !auth.is_some_and(|a| a.is(id)) {
        return Err(ApiError::Forbidden(Message::ForbiddenUpdate));
    }
    let JsonBody(payload) = payload?;

    let mut errors = ValidationErrors::new();
    if let Err(message) = check_username(payload.username.as_deref()) {
        errors.insert("username", message);
    }
    let image = match payload.image.as_deref().filter(|i| !i.is_empty()) {
        Some(image) => match decode_avatar(image) {
            Ok(bytes) => Some(bytes),
            Err(message) => {
                errors.insert("image", message);
                None
            }
        },
        None => None,
    };
    let Some(username) = payload.username.filter(|_| errors.is_empty()) else {
        return Err(ApiError::Validation(errors));
    };

    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .ok_or(ApiError::NotFound(Message::UserNotFound))?;

    let new_avatar = match image {
        Some(bytes) => Some(
            state
                .avatars
                .save(&bytes)
                .await
                .db_err("Failed to store avatar")?,
        ),
        None => None,
    };
    let avatar = new_avatar.as_deref().or(user.avatar.as_deref());

    if let Err(e) = state.db.users().update_profile(id, &username, avatar).await {
        if let Some(name) = &new_avatar {
            state.avatars.delete(name).await;
        }
        return Err(ApiError::internal("Failed to update user", e));
    }

    if let (Some(_), Some(old)) = (&new_avatar, &user.avatar) {
        state.avatars.delete(old).await;
    }

    Ok(Json(UserView {
        id,
        username,
        email: user.email,
        avatar: new_avatar.or(user.avatar),
    }))
}

async fn delete_user(
    State(state): State<UsersState>,
    OptionalAuth(auth): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if !auth.is_some_and(|a| a.is(id)) {
        return Err(ApiError::Forbidden(Message::ForbiddenDelete));
    }

    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .ok_or(ApiError::NotFound(Message::UserNotFound))?;

    // Token rows reference the user, so they go first in the same transaction.
    let mut tx = state.db.begin().await.db_err("Failed to start transaction")?;
    let revoked = state
        .tokens
        .invalidate_all_in(&mut tx, id)
        .await
        .db_err("Failed to invalidate sessions")?;
    UserStore::delete_in(&mut tx, id)
        .await
        .db_err("Failed to delete user")?;
    tx.commit().await.db_err("Failed to delete user")?;

    if let Some(avatar) = &user.avatar {
        state.avatars.delete(avatar).await;
    }

    info!(user_id = id, revoked, "User deleted");
    Ok(StatusCode::OK)
}
