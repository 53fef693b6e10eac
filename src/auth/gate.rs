//! Per-request token resolution middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};

use super::bearer::bearer_token;
use super::types::AuthenticatedUser;
use crate::tokens::{TokenError, TokenService};

/// Attach the caller's identity to the request, or nothing.
///
/// Verification failures are not errors here. Unknown, expired and even
/// storage-failed lookups all continue without an identity, and the route
/// decides what that means.
pub async fn authenticate(
    State(tokens): State<TokenService>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(request.headers()).map(str::to_owned);

    if let Some(token) = token {
        match tokens.verify(&token).await {
            Ok(user_id) => {
                request
                    .extensions_mut()
                    .insert(AuthenticatedUser { user_id, token });
            }
            Err(TokenError::Unauthenticated) => {
                debug!("Bearer token did not verify");
            }
            Err(e) => {
                error!(error = %e, "Failed to verify bearer token");
            }
        }
    }

    next.run(request).await
}
