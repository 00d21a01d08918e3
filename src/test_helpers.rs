use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::{AuthScheme, Config};
use crate::db::{User, UserRepository};

/// Fresh in-memory database with migrations applied. A single connection
/// keeps every query on the same memory database.
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create in-memory SQLite pool");

    crate::db::migrate(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub async fn test_user(pool: &SqlitePool, username: &str) -> User {
    UserRepository::create(pool, username, "unused-hash")
        .await
        .expect("Failed to create test user")
}

pub fn test_config(auth_scheme: AuthScheme) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        db_min_connections: 1,
        request_timeout_secs: 5,
        auth_scheme,
        session_ttl_secs: 3600,
        jwt_secret: "test-secret".to_string(),
        jwt_issuer: "nexus-im".to_string(),
        jwt_validity_secs: 3600,
    }
}
