use std::collections::HashSet;

use axum::http::HeaderValue;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Issued tokens are valid for one day
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Decoded token payload.
///
/// Tokens carry whatever the caller asked to have signed, so claims stay an
/// open JSON object rather than a fixed struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn email(&self) -> Option<&Value> {
        self.get("email")
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.get("exp").and_then(Value::as_i64)
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Missing Authorization header")]
    Missing,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("JWT encoding error: {0}")]
    Encoding(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,
}

/// Signs and verifies bearer tokens with the process-wide shared secret
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::InvalidSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Sign `payload` with a one-day expiry. Any object is accepted, `{}` included.
    pub fn issue(&self, payload: Map<String, Value>) -> Result<String, TokenError> {
        self.issue_at(payload, Utc::now())
    }

    pub fn issue_at(
        &self,
        mut payload: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let exp = (now + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp();

        if payload.contains_key("exp") || payload.contains_key("iat") {
            debug!("Overriding caller-supplied iat/exp in token payload");
        }
        // Unlike node jsonwebtoken, a caller-supplied iat is not kept
        payload.insert("iat".to_string(), Value::from(iat));
        payload.insert("exp".to_string(), Value::from(exp));

        encode(&Header::default(), &payload, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify a raw token string
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }

    /// Verify the value of an `Authorization` header.
    ///
    /// An absent or blank header is [`TokenError::Missing`]; everything else that goes
    /// wrong (unreadable header, no token segment, bad signature, expiry) is
    /// [`TokenError::Invalid`].
    pub fn verify_header(&self, header: Option<&HeaderValue>) -> Result<Claims, TokenError> {
        let header = header.ok_or(TokenError::Missing)?;
        let header = header
            .to_str()
            .map_err(|_| TokenError::Invalid("Authorization header is not valid UTF-8".to_string()))?;
        // A blank header is treated the same as no header
        if header.trim().is_empty() {
            return Err(TokenError::Missing);
        }
        let token = bearer_token(header)
            .ok_or_else(|| TokenError::Invalid("jwt must be provided".to_string()))?;
        self.verify(token)
    }
}

/// The token is the second space-separated segment of the header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header.split(' ').nth(1)
}
