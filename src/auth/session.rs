//! Opaque, server-side session tokens.

use sqlx::SqlitePool;

use crate::auth::error::AuthError;
use crate::db::{Session, SessionRepository};

#[derive(Clone)]
pub struct SessionAuthenticator {
    db: SqlitePool,
    ttl_secs: i64,
}

impl SessionAuthenticator {
    pub fn new(db: SqlitePool, ttl_secs: i64) -> Self {
        Self { db, ttl_secs }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub async fn create(&self, user_id: &str) -> Result<Session, AuthError> {
        Ok(SessionRepository::create(&self.db, user_id, self.ttl_secs).await?)
    }

    /// Unknown, expired and purged tokens are indistinguishable here.
    pub async fn get_by_token(&self, token: &str) -> Result<Session, AuthError> {
        SessionRepository::get_by_token(&self.db, token)
            .await?
            .ok_or(AuthError::SessionNotFound)
    }
}
