//! Signed identity tokens.
//!
//! Tokens are compact HS256 JWS strings carrying `sub`, `iat` and `exp`.
//! A single symmetric key signs and verifies every token; there is no
//! rotation and no server-side session state.

use std::fmt;

use anyhow::{Context, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::UserId;

/// How long an issued token stays valid (2 hours).
pub const TOKEN_VALIDITY_SECONDS: i64 = 2 * 60 * 60;

/// Minimum decoded key length for HS256 (256 bits).
pub const MIN_SECRET_BYTES: usize = 32;

/// Claims carried by every identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (account id, serialized as a string)
    pub sub: String,
    /// Issued-at (Unix timestamp, seconds)
    pub iat: i64,
    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,
}

/// Verification failure.
///
/// Malformed, forged and expired tokens all collapse into this one kind.
/// The reason is kept for logs only; `Display` is always generic.
#[derive(Debug, Clone)]
pub struct TokenError {
    reason: String,
}

impl TokenError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Internal reason, for logging.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid token")
    }
}

impl std::error::Error for TokenError {}

/// Issues and verifies identity tokens with the process-wide signing key.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    validity: Duration,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS256)
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec from base64-encoded key material.
    ///
    /// Fails if the secret is not valid base64 or decodes to fewer than
    /// [`MIN_SECRET_BYTES`] bytes. Callers treat this as a fatal startup error.
    pub fn from_base64_secret(secret: &str) -> anyhow::Result<Self> {
        let key = STANDARD
            .decode(secret.trim())
            .context("JWT secret is not valid base64")?;

        if key.len() < MIN_SECRET_BYTES {
            bail!(
                "JWT secret must decode to at least {} bytes (got {})",
                MIN_SECRET_BYTES,
                key.len()
            );
        }

        Ok(Self::from_key_bytes(&key))
    }

    fn from_key_bytes(key: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked in `verify_at` against the caller's clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            validation,
            validity: Duration::seconds(TOKEN_VALIDITY_SECONDS),
        }
    }

    /// Issue a token for `user_id`, valid from now for the validity window.
    pub fn issue(&self, user_id: UserId) -> Result<String, TokenError> {
        self.issue_at(&user_id.to_string(), Utc::now())
    }

    /// Issue a token for an arbitrary subject with an explicit issue time.
    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::new(format!("encoding failed: {}", e)))
    }

    /// Verify a token and return its subject.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token against an explicit clock.
    ///
    /// A token is valid while `now < exp`; at `now == exp` it is expired.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::new(format!("decode failed: {}", e)))?;

        let claims = data.claims;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::new(format!(
                "token expired at {} (now {})",
                claims.exp,
                now.timestamp()
            )));
        }

        debug!("Token verified for subject: {}", claims.sub);
        Ok(claims.sub)
    }
}
