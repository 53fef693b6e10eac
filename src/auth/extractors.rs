//! Axum extractors for the identity attached by the gate.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::types::AuthenticatedUser;
use crate::api::ApiError;
use crate::i18n::Message;

/// Optional authentication extractor - never fails.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}

/// Requires an identity; rejects with 401 `Unauthenticated` otherwise.
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(RequireAuth)
            .ok_or(ApiError::Unauthorized(Message::Unauthenticated))
    }
}
