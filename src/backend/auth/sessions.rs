/**
 * Token Verification
 *
 * This module defines the `TokenService` seam used by the auth gate and an
 * HS256 JWT implementation of it. Token issuance lives here too so the
 * development server and the tests can mint tokens the gate accepts.
 */
use async_trait::async_trait;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Email
    #[serde(default)]
    pub email: Option<String>,
    /// Username
    #[serde(default)]
    pub username: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

/// Result of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: String,
    pub claims: Claims,
}

/// Token verification failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token rejected: {0}")]
    Invalid(String),
}

/// Verifies bearer tokens presented at connect time
#[async_trait]
pub trait TokenService: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError>;
}

const DEV_SECRET: &str = "xfboard-dev-secret-change-in-production";

/// HS256 JWT token service
#[derive(Clone)]
pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl JwtTokenService {
    /// Create a service signing with `secret`; tokens live 30 days
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs: 30 * 24 * 60 * 60,
        }
    }

    /// Create a service from `JWT_SECRET`
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("[Auth] JWT_SECRET not set, using the development secret");
            DEV_SECRET.to_string()
        });
        Self::new(&secret)
    }

    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Create a JWT token for a user
    pub fn create_token(
        &self,
        user_id: Uuid,
        email: Option<String>,
        username: Option<String>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let claims = Claims {
            sub: user_id.to_string(),
            email,
            username,
            exp: now + self.ttl_secs,
            iat: now,
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Verify and decode a JWT token
    pub fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::default();
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[async_trait]
impl TokenService for JwtTokenService {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let claims = self.decode_claims(token)?;
        Ok(VerifiedToken {
            user_id: claims.sub.clone(),
            claims,
        })
    }
}
