use sqlx::{Pool, Sqlite};
use crate::crypto::generate_session_token;
use crate::db::models::Session;
use crate::error::AppError;

pub struct SessionRepository;

impl SessionRepository {
    /// Issues a fresh opaque token for `user_id` valid for `ttl_secs`.
    pub async fn create(
        pool: &Pool<Sqlite>,
        user_id: &str,
        ttl_secs: i64,
    ) -> Result<Session, AppError> {
        let token = generate_session_token();
        let created_at = chrono::Utc::now().timestamp();
        let expires_at = created_at + ttl_secs;

        let session = sqlx::query_as::<_, Session>(
            r#"
INSERT INTO sessions (token, user_id, created_at, expires_at)
VALUES (?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(&token)
        .bind(user_id)
        .bind(created_at)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    /// Expired rows are filtered out here, so purged, expired and unknown
    /// tokens all come back as `None`.
    pub async fn get_by_token(
        pool: &Pool<Sqlite>,
        token: &str,
    ) -> Result<Option<Session>, AppError> {
        let now = chrono::Utc::now().timestamp();

        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE token = ? AND expires_at > ?"
        )
        .bind(token)
        .bind(now)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    pub async fn cleanup_expired(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
