//! Authentication user types.

/// Identity attached to a request by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Database user ID
    pub user_id: i64,
    /// The bearer token that resolved to this user
    pub token: String,
}

impl AuthenticatedUser {
    pub fn is(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}
