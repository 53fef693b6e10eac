//! Session token storage.
//!
//! One row per issued bearer token. `last_used_at` is Unix milliseconds and
//! drives sliding expiration; see `crate::tokens::TokenService`.

use sqlx::sqlite::{SqliteConnection, SqlitePool};

/// A stored session token row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionToken {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
    pub last_used_at: i64,
}

/// Store for session tokens.
#[derive(Clone)]
pub struct TokenStore {
    pool: SqlitePool,
}

impl TokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new token row.
    pub async fn create(
        &self,
        token: &str,
        user_id: i64,
        last_used_at: i64,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO tokens (token, user_id, last_used_at) VALUES (?, ?, ?)")
                .bind(token)
                .bind(user_id)
                .bind(last_used_at)
                .execute(&self.pool)
                .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a token row by its token string.
    pub async fn get(&self, token: &str) -> Result<Option<SessionToken>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, token, user_id, last_used_at FROM tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    /// Set `last_used_at = now` if the row is still newer than `cutoff`.
    ///
    /// Check and update happen in one statement, so a concurrent delete either
    /// wins (no row returned) or happens afterwards. Returns the owning user id.
    pub async fn touch_if_newer(
        &self,
        token: &str,
        cutoff: i64,
        now: i64,
    ) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE tokens SET last_used_at = ? WHERE token = ? AND last_used_at > ? RETURNING user_id",
        )
        .bind(now)
        .bind(token)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Delete a single token.
    pub async fn delete(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every token owned by a user.
    pub async fn delete_by_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::delete_by_user_in(&mut conn, user_id).await
    }

    /// [`TokenStore::delete_by_user`] on a caller-held connection or transaction.
    pub async fn delete_by_user_in(
        conn: &mut SqliteConnection,
        user_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every token last used at or before `cutoff`.
    pub async fn delete_not_newer_than(&self, cutoff: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tokens WHERE last_used_at <= ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// List all tokens owned by a user, most recently used first.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<SessionToken>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, token, user_id, last_used_at FROM tokens WHERE user_id = ? ORDER BY last_used_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
