//! Opaque bearer-token sessions with sliding expiration.
//!
//! A token is live while `now - last_used_at < window`. Every successful
//! [`TokenService::verify`] moves `last_used_at` to now, so a session only
//! expires after a full window of inactivity. Expired rows are ignored by
//! `verify` and physically removed by [`TokenService::run_cleanup_sweep`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::{Rng, distr::Alphanumeric};
use sqlx::sqlite::SqliteConnection;
use tracing::debug;

use crate::db::{Database, TokenStore};

/// Length of generated token strings.
pub const TOKEN_LENGTH: usize = 32;

/// Default inactivity window: 7 days.
pub const DEFAULT_EXPIRY_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Unknown or expired token. The two cases are not distinguished.
    #[error("token is unknown or expired")]
    Unauthenticated,
    #[error("token storage failed: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Issues, verifies, renews and revokes session tokens.
///
/// Cheap to clone; all state lives in the database.
#[derive(Clone)]
pub struct TokenService {
    store: TokenStore,
    window_ms: i64,
}

impl TokenService {
    pub fn new(db: &Database, window: Duration) -> Self {
        Self {
            store: db.tokens(),
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms as u64)
    }

    /// Create a new token for `user_id` with `last_used_at = now`.
    pub async fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        let token = random_string(TOKEN_LENGTH);
        self.store.create(&token, user_id, now_millis()).await?;
        debug!(user_id, "Issued session token");
        Ok(token)
    }

    /// Resolve a token to its user id and renew it.
    pub async fn verify(&self, token: &str) -> Result<i64, TokenError> {
        let now = now_millis();
        let cutoff = now.saturating_sub(self.window_ms);
        self.store
            .touch_if_newer(token, cutoff, now)
            .await?
            .ok_or(TokenError::Unauthenticated)
    }

    /// Delete a single token. Deleting an unknown token is not an error.
    pub async fn invalidate(&self, token: &str) -> Result<(), TokenError> {
        self.store.delete(token).await?;
        Ok(())
    }

    /// Delete every token owned by `user_id`. Returns the number removed.
    pub async fn invalidate_all(&self, user_id: i64) -> Result<u64, TokenError> {
        let removed = self.store.delete_by_user(user_id).await?;
        debug!(user_id, removed, "Invalidated all session tokens");
        Ok(removed)
    }

    /// [`TokenService::invalidate_all`] as part of the caller's transaction.
    ///
    /// The tokens stay live unless the transaction commits.
    pub async fn invalidate_all_in(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
    ) -> Result<u64, TokenError> {
        let removed = TokenStore::delete_by_user_in(conn, user_id).await?;
        debug!(user_id, removed, "Invalidated all session tokens in transaction");
        Ok(removed)
    }

    /// Delete every expired token. Returns the number removed.
    pub async fn run_cleanup_sweep(&self) -> Result<u64, TokenError> {
        let cutoff = now_millis().saturating_sub(self.window_ms);
        Ok(self.store.delete_not_newer_than(cutoff).await?)
    }
}

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Random alphanumeric string of the given length.
pub fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
