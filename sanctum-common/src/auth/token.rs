//! Signed session tokens
//!
//! Compact HS256 tokens in the familiar `header.claims.signature` layout:
//! each segment is base64url without padding, the signature is
//! HMAC-SHA-256 over `header.claims`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use uuid::Uuid;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Session lifetime
pub const TOKEN_TTL_DAYS: i64 = 7;

/// Signing key used when development mode has no configured secret
pub const DEV_TOKEN_SECRET: &str = "sanctum-development-only-token-secret-not-for-production";

const ALGORITHM: &str = "HS256";

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: Uuid,
    pub username: String,
    /// Issued-at, seconds since the Unix epoch
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
}

/// Why a token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidToken {
    #[error("token is malformed")]
    Malformed,

    #[error("token algorithm is not supported")]
    UnsupportedAlgorithm,

    #[error("token signature does not match")]
    BadSignature,

    #[error("token has expired")]
    Expired,
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Issues and verifies session tokens with one HMAC key
#[derive(Clone)]
pub struct TokenService {
    key: Arc<[u8]>,
    ttl_seconds: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("key", &"<redacted>")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: Arc::from(secret),
            ttl_seconds: TOKEN_TTL_DAYS * 24 * 60 * 60,
        }
    }

    /// Override the token lifetime (negative values issue already-expired tokens)
    pub fn with_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.ttl_seconds = ttl.num_seconds();
        self
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|e| Error::Internal(format!("Invalid token key: {}", e)))
    }

    /// Issue a token for `user_id` valid from now until now + TTL
    pub fn issue_token(&self, user_id: Uuid, username: &str) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            user_id,
            username: username.to_string(),
            iat,
            exp: iat + self.ttl_seconds,
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };

        let header_json = serde_json::to_vec(&header)
            .map_err(|e| Error::Internal(format!("Token header encoding failed: {}", e)))?;
        let claims_json = serde_json::to_vec(claims)
            .map_err(|e| Error::Internal(format!("Token claims encoding failed: {}", e)))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Verify structure, algorithm, signature and expiry
    pub fn verify_token(&self, token: &str) -> std::result::Result<Claims, InvalidToken> {
        self.verify_at(token, Utc::now().timestamp())
    }

    fn verify_at(&self, token: &str, now: i64) -> std::result::Result<Claims, InvalidToken> {
        let mut parts = token.split('.');
        let (header_b64, claims_b64, signature_b64) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(c), Some(s), None) => (h, c, s),
                _ => return Err(InvalidToken::Malformed),
            };

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| InvalidToken::Malformed)?;
        let header: Header =
            serde_json::from_slice(&header_bytes).map_err(|_| InvalidToken::Malformed)?;
        if header.alg != ALGORITHM {
            return Err(InvalidToken::UnsupportedAlgorithm);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| InvalidToken::Malformed)?;

        let mut mac = self.mac().map_err(|_| InvalidToken::BadSignature)?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| InvalidToken::BadSignature)?;

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| InvalidToken::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&claims_bytes).map_err(|_| InvalidToken::Malformed)?;

        if claims.exp <= now {
            return Err(InvalidToken::Expired);
        }

        Ok(claims)
    }
}
