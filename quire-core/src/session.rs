//! Signed session tokens
//!
//! A session token is an HS256 JWT whose `sub` claim carries the user id.
//! The server keeps no session state; the signature is the proof.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque client-held credential
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("session subject is not a user id: {0}")]
    Subject(String),
}

/// Signing and verification keys derived from the configured secret
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user_id`, valid for the configured ttl.
    pub fn issue(&self, user_id: i32) -> Result<SessionToken, SessionError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(SessionToken(token))
    }

    /// Check signature and expiry, returning the embedded user id.
    pub fn verify(&self, token: &SessionToken) -> Result<i32, SessionError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<SessionClaims>(token.as_str(), &self.decoding, &validation)?;
        data.claims
            .sub
            .parse()
            .map_err(|_| SessionError::Subject(data.claims.sub))
    }
}
