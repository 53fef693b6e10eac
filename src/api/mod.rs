mod auth;
mod error;
mod password_reset;
mod users;
mod validation;

use axum::Router;

use crate::db::Database;
use crate::email::EmailService;
use crate::storage::AvatarStorage;
use crate::tokens::TokenService;

pub use auth::AuthState;
pub use error::{ApiError, render_errors};
pub use password_reset::PasswordResetState;
pub use users::UsersState;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    tokens: TokenService,
    email: EmailService,
    avatars: AvatarStorage,
) -> Router {
    let auth_state = AuthState {
        db: db.clone(),
        tokens: tokens.clone(),
    };

    let password_reset_state = PasswordResetState {
        db: db.clone(),
        tokens: tokens.clone(),
        email: email.clone(),
    };

    let users_state = UsersState {
        db,
        tokens,
        email,
        avatars,
    };

    Router::new()
        .nest("/auth", auth::router(auth_state))
        .nest("/users", users::router(users_state))
        .nest("/password-reset", password_reset::router(password_reset_state))
}
