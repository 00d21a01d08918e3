//! Credential issuance and resolution.
//!
//! Both schemes sit behind [`Authenticator`]; the configured `AUTH_SCHEME`
//! picks the variant once at startup and handlers never branch on it.

pub mod error;
pub mod gateway;
pub mod jwt;
pub mod session;

pub use error::AuthError;
pub use gateway::{extract_credential, resolve_identity, SESSION_TOKEN_HEADER};
pub use jwt::{Claims, TokenIssuer};
pub use session::SessionAuthenticator;

use sqlx::SqlitePool;

use crate::config::{AuthScheme, Config};
use crate::db::User;

/// The authenticated caller attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    /// Only the signed-claims scheme carries this without a lookup.
    pub username: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

#[derive(Clone)]
pub enum Authenticator {
    Jwt(TokenIssuer),
    Session(SessionAuthenticator),
}

impl Authenticator {
    pub fn from_config(config: &Config, db: SqlitePool) -> Self {
        match config.auth_scheme {
            AuthScheme::Jwt => Authenticator::Jwt(TokenIssuer::new(
                config.jwt_secret.as_bytes(),
                config.jwt_issuer.clone(),
                config.jwt_validity_secs,
            )),
            AuthScheme::Session => {
                Authenticator::Session(SessionAuthenticator::new(db, config.session_ttl_secs))
            }
        }
    }

    pub fn scheme(&self) -> AuthScheme {
        match self {
            Authenticator::Jwt(_) => AuthScheme::Jwt,
            Authenticator::Session(_) => AuthScheme::Session,
        }
    }

    /// Issue a credential for a user whose password has already been checked.
    pub async fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        match self {
            Authenticator::Jwt(issuer) => Ok(IssuedToken {
                token: issuer.issue(&user.id, &user.username)?,
                expires_in: issuer.validity_secs(),
            }),
            Authenticator::Session(sessions) => {
                let session = sessions.create(&user.id).await?;
                Ok(IssuedToken {
                    token: session.token,
                    expires_in: sessions.ttl_secs(),
                })
            }
        }
    }

    /// Resolve a presented credential to the identity it stands for.
    pub async fn resolve(&self, credential: &str) -> Result<Identity, AuthError> {
        match self {
            Authenticator::Jwt(issuer) => {
                let claims = issuer.verify(credential)?;
                Ok(Identity {
                    user_id: claims.sub,
                    username: Some(claims.username),
                })
            }
            Authenticator::Session(sessions) => {
                let session = sessions.get_by_token(credential).await?;
                Ok(Identity {
                    user_id: session.user_id,
                    username: None,
                })
            }
        }
    }
}
