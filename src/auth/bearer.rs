//! `Authorization` header parsing.

use axum::http::{HeaderMap, header};

/// Scheme prefix, including the single separating space.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Extract the bearer token from the `Authorization` header.
///
/// The token is the rest of the header value after `"Bearer "`, verbatim.
/// Missing headers, other schemes and empty tokens yield `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
}
