use sqlx::sqlite::{SqliteConnection, SqlitePool};

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Password digest.
    pub password: String,
    pub is_active: bool,
    pub activation_token: Option<String>,
    pub password_reset_token: Option<String>,
    pub avatar: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password: String,
    is_active: i32,
    activation_token: Option<String>,
    password_reset_token: Option<String>,
    avatar: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password: row.password,
            is_active: row.is_active != 0,
            activation_token: row.activation_token,
            password_reset_token: row.password_reset_token,
            avatar: row.avatar,
        }
    }
}

/// Fields needed to insert a user.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub activation_token: Option<&'a str>,
}

const USER_COLUMNS: &str = "id, username, email, password, is_active, activation_token, password_reset_token, avatar";

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new inactive user. Returns the user ID.
    pub async fn create(&self, user: &NewUser<'_>) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password, is_active, activation_token) VALUES (?, ?, ?, 0, ?)",
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.activation_token)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by email.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Get a user holding the given password reset token.
    pub async fn get_by_password_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE password_reset_token = ?");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Activate the user holding `token` and clear it.
    pub async fn activate_by_token(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET is_active = 1, activation_token = NULL WHERE activation_token = ?",
        )
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the active flag directly.
    pub async fn set_active(&self, id: i64, active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(active as i32)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_password_reset_token(
        &self,
        id: i64,
        token: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_reset_token = ? WHERE id = ?")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store a new password digest, clear pending activation/reset tokens and
    /// activate the account.
    pub async fn reset_password(&self, id: i64, password_hash: &str) -> Result<bool, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::reset_password_in(&mut conn, id, password_hash).await
    }

    /// [`UserStore::reset_password`] on a caller-held connection or transaction.
    pub async fn reset_password_in(
        conn: &mut SqliteConnection,
        id: i64,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password = ?, password_reset_token = NULL, activation_token = NULL, is_active = 1 WHERE id = ?",
        )
        .bind(password_hash)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update the public profile fields.
    pub async fn update_profile(
        &self,
        id: i64,
        username: &str,
        avatar: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET username = ?, avatar = ? WHERE id = ?")
            .bind(username)
            .bind(avatar)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user by ID. Fails while session tokens still reference the user.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::delete_in(&mut conn, id).await
    }

    pub async fn delete_in(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count active users, optionally leaving one out.
    pub async fn count_active(&self, exclude: Option<i64>) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE is_active = 1 AND (? IS NULL OR id != ?)",
        )
        .bind(exclude)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    /// One page of active users ordered by id, optionally leaving one out.
    pub async fn list_active(
        &self,
        exclude: Option<i64>,
        page: i64,
        size: i64,
    ) -> Result<Vec<User>, sqlx::Error> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active = 1 AND (? IS NULL OR id != ?) ORDER BY id LIMIT ? OFFSET ?"
        );
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(exclude)
            .bind(exclude)
            .bind(size)
            .bind(page.saturating_mul(size))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}
