//! Bearer-token authentication gate.
//!
//! [`authenticate`] runs in front of every API route. It resolves the
//! `Authorization: Bearer <token>` header through the `TokenService` and, on
//! success, attaches an [`AuthenticatedUser`] to the request. It never rejects:
//! routes decide for themselves whether they need an identity, using the
//! [`OptionalAuth`] and [`RequireAuth`] extractors.

mod bearer;
mod extractors;
mod gate;
mod types;

pub use bearer::{BEARER_PREFIX, bearer_token};
pub use extractors::{OptionalAuth, RequireAuth};
pub use gate::authenticate;
pub use types::AuthenticatedUser;
