use std::str::FromStr;

use crate::error::AppError;

/// Which credential scheme the server issues and accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// Opaque random tokens backed by the `sessions` table.
    Session,
    /// Self-contained HS256 signed claims.
    Jwt,
}

impl FromStr for AuthScheme {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(AuthScheme::Session),
            "jwt" => Ok(AuthScheme::Jwt),
            other => Err(AppError::Config(format!("Invalid AUTH_SCHEME: {}", other))),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub request_timeout_secs: u64,
    pub auth_scheme: AuthScheme,
    pub session_ttl_secs: i64,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_validity_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let config = Config {
            server_host: std::env::var("SERVER_HOST")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: parse_var("SERVER_PORT", "8080")?,
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://nexus.db".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", "20")?,
            db_min_connections: parse_var("DB_MIN_CONNECTIONS", "5")?,
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", "30")?,
            auth_scheme: parse_var("AUTH_SCHEME", "session")?,
            session_ttl_secs: parse_var("SESSION_TTL_SECS", "86400")?,
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or_default(),
            jwt_issuer: std::env::var("JWT_ISSUER")
                .unwrap_or_else(|_| "nexus-im".to_string()),
            jwt_validity_secs: parse_var("JWT_VALIDITY_SECS", "86400")?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.auth_scheme == AuthScheme::Jwt && self.jwt_secret.is_empty() {
            return Err(AppError::Config(
                "JWT_SECRET must be set when AUTH_SCHEME=jwt".to_string(),
            ));
        }
        if self.db_min_connections > self.db_max_connections {
            return Err(AppError::Config(
                "DB_MIN_CONNECTIONS exceeds DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e)))
}
