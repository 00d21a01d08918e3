use sqlx::{Pool, Sqlite};
use uuid::Uuid;
use crate::db::models::User;
use crate::error::{is_unique_violation, AppError};

pub struct UserRepository;

impl UserRepository {
    /// Inserts a new user. A taken username is reported as `AppError::Conflict`.
    pub async fn create(
        pool: &Pool<Sqlite>,
        username: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp();

        let user = sqlx::query_as::<_, User>(
            r#"
INSERT INTO users (id, username, password_hash, created_at, last_seen)
VALUES (?, ?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(&id)
        .bind(username)
        .bind(password_hash)
        .bind(created_at)
        .bind(created_at)
        .fetch_one(pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::Conflict("Username already exists".to_string())
            } else {
                AppError::Database(err)
            }
        })?;

        Ok(user)
    }

    pub async fn get_by_username(
        pool: &Pool<Sqlite>,
        username: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = ?"
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_id(
        pool: &Pool<Sqlite>,
        id: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn touch_last_seen(
        pool: &Pool<Sqlite>,
        id: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_seen = ? WHERE id = ?")
            .bind(chrono::Utc::now().timestamp())
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_pool;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let pool = test_pool().await;
        let user = UserRepository::create(&pool, "alice", "hash").await.unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.created_at, user.last_seen);

        let by_name = UserRepository::get_by_username(&pool, "alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        let by_id = UserRepository::get_by_id(&pool, &user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert!(UserRepository::get_by_username(&pool, "bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let pool = test_pool().await;
        UserRepository::create(&pool, "alice", "hash").await.unwrap();

        let err = UserRepository::create(&pool, "alice", "other").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
