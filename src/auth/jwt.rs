//! Stateless HS256 signed-claims tokens.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::error::AuthError;

/// Claims carried by every signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the user id.
    pub sub: String,
    pub username: String,
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Not-before (Unix timestamp).
    pub nbf: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    validity_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], issuer: impl Into<String>, validity_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            validity_secs,
        }
    }

    pub fn validity_secs(&self) -> i64 {
        self.validity_secs
    }

    pub fn issue(&self, user_id: &str, username: &str) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            nbf: now,
            exp: now + self.validity_secs,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Checks the algorithm, then the signature, then `now < exp`, then the
    /// shape of the claims. No clock-skew leeway is applied.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // expiry is checked below so that `exp == now` already counts as expired
        validation.validate_exp = false;
        validation.validate_nbf = true;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["sub", "iss", "nbf", "exp"]);

        let raw = jsonwebtoken::decode::<serde_json::Value>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidAlgorithm => {
                    AuthError::TokenInvalid("unexpected signing algorithm".to_string())
                }
                ErrorKind::InvalidSignature => {
                    AuthError::TokenInvalid("signature mismatch".to_string())
                }
                _ => AuthError::TokenInvalid(e.to_string()),
            })?
            .claims;

        let exp = raw
            .get("exp")
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| AuthError::TokenInvalid("malformed exp".to_string()))?;
        if chrono::Utc::now().timestamp() >= exp {
            return Err(AuthError::TokenExpired);
        }

        let claims: Claims = serde_json::from_value(raw)
            .map_err(|e| AuthError::TokenInvalid(format!("malformed claims: {}", e)))?;
        if claims.sub.is_empty() || claims.nbf > claims.iat || claims.iat >= claims.exp {
            return Err(AuthError::TokenInvalid("inconsistent claims".to_string()));
        }

        Ok(claims)
    }
}
