// ============================
// sessiongate-backend/src/auth/token.rs
// ============================
//! Bearer token issuing and verification.
//!
//! Tokens are HS256 JWTs carrying the session id (`sid`) and user id (`sub`).
//! [`TokenIssuer::verify`] is the strict path (signature + expiry) used on every
//! authenticated request; [`TokenIssuer::decode`] checks the signature only and
//! exists for the refresh flow, where an expired token is the expected input.
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims carried by a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Session id the token references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// User id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Why a token was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Well-formed, but not signed by us (or signed with another algorithm)
    #[error("bad signature")]
    BadSignature,
    /// Correctly signed, past its `exp`
    #[error("expired")]
    Expired,
    /// Not a JWT we can parse
    #[error("malformed token")]
    Malformed,
}

impl From<jsonwebtoken::errors::Error> for DecodeError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => DecodeError::BadSignature,
            ErrorKind::ExpiredSignature => DecodeError::Expired,
            _ => DecodeError::Malformed,
        }
    }
}

/// Signs and checks bearer tokens with a process-wide secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    strict: Validation,
    lenient: Validation,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut strict = Validation::new(Algorithm::HS256);
        strict.leeway = 0;

        let mut lenient = strict.clone();
        lenient.validate_exp = false;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
            strict,
            lenient,
        }
    }

    /// Issue a token with the configured lifetime
    pub fn issue(&self, session_id: &str, user_id: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        self.issue_with_ttl(session_id, user_id, ttl_secs)
    }

    /// Issue a token expiring `expires_in` seconds from now; negative values
    /// produce an already-expired token
    pub fn issue_with_ttl(
        &self,
        session_id: &str,
        user_id: &str,
        expires_in: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sid: Some(session_id.to_string()),
            sub: Some(user_id.to_string()),
            iat: now,
            exp: now.saturating_add(expires_in),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Strict verification: signature and expiry
    pub fn verify(&self, token: &str) -> Result<Claims, DecodeError> {
        Ok(decode::<Claims>(token, &self.decoding, &self.strict)?.claims)
    }

    /// Lenient decoding: signature only, expiry ignored
    pub fn decode(&self, token: &str) -> Result<Claims, DecodeError> {
        Ok(decode::<Claims>(token, &self.decoding, &self.lenient)?.claims)
    }
}
