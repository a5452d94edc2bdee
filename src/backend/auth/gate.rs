/**
 * Authentication Gate
 *
 * The gate runs once per connection attempt. On success it returns the
 * `Identity` that the connection context carries into every handler; on
 * failure the caller refuses the connection.
 */
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::sessions::{Claims, TokenError, TokenService};
use crate::backend::error::BackendError;
use crate::backend::store::DataStore;
use crate::shared::{ActorProfile, UserProfile};

/// What a client presents when it opens a connection
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    /// Token from the auth payload (e.g. an `Authorization: Bearer` header)
    pub auth_token: Option<String>,
    /// Query parameters of the upgrade request
    pub query: HashMap<String, String>,
    /// Peer address, used to key rate limits before authentication
    pub remote_addr: Option<SocketAddr>,
}

impl Handshake {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            auth_token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn with_query_token(token: impl Into<String>) -> Self {
        let mut query = HashMap::new();
        query.insert("token".to_string(), token.into());
        Self {
            query,
            ..Self::default()
        }
    }

    /// The bearer token, preferring the auth payload over the query fallback
    ///
    /// An auth payload that carries no usable token (blank, or another
    /// scheme such as `Basic`) defers to `?token=`.
    pub fn token(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .and_then(bearer)
            .or_else(|| self.query.get("token").and_then(|raw| bearer(raw)))
    }
}

/// Accepts `Bearer <token>` or a bare token
fn bearer(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    let token = match raw.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None if raw.eq_ignore_ascii_case("bearer") => return None,
        None => raw,
    };
    (!token.is_empty()).then_some(token)
}

/// An authenticated actor bound to one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: UserProfile,
    pub claims: Claims,
}

impl Identity {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn is_global_admin(&self) -> bool {
        self.user.is_admin
    }

    /// Profile attached to broadcasts made by this identity
    pub fn actor(&self) -> ActorProfile {
        ActorProfile::from(&self.user)
    }
}

/// Verifies connection handshakes
#[derive(Clone)]
pub struct AuthGate {
    tokens: Arc<dyn TokenService>,
    store: Arc<dyn DataStore>,
    timeout: Duration,
}

impl AuthGate {
    pub fn new(tokens: Arc<dyn TokenService>, store: Arc<dyn DataStore>, timeout: Duration) -> Self {
        Self {
            tokens,
            store,
            timeout,
        }
    }

    /// Authenticate a handshake
    ///
    /// # Errors
    ///
    /// * `Unauthenticated` - no token in the auth payload or query
    /// * `InvalidToken` - verification failed or the subject is not a UUID
    /// * `UserNotFound` - the subject has no user record
    /// * `AuthTimeout` - verification plus lookup exceeded the connect timeout
    pub async fn authenticate(&self, handshake: &Handshake) -> Result<Identity, BackendError> {
        let token = handshake.token().ok_or_else(|| {
            tracing::warn!("[AuthGate] Connection without token from {:?}", handshake.remote_addr);
            BackendError::unauthenticated("authentication token required")
        })?;

        match tokio::time::timeout(self.timeout, self.resolve(token)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "[AuthGate] Token verification exceeded {}ms",
                    self.timeout.as_millis()
                );
                Err(BackendError::AuthTimeout {
                    millis: self.timeout.as_millis() as u64,
                })
            }
        }
    }

    async fn resolve(&self, token: &str) -> Result<Identity, BackendError> {
        let verified = self.tokens.verify(token).await.map_err(|e| {
            tracing::warn!("[AuthGate] Token rejected: {}", e);
            match e {
                TokenError::Expired => BackendError::invalid_token("token expired"),
                TokenError::Invalid(reason) => BackendError::invalid_token(reason),
            }
        })?;

        let user_id = Uuid::parse_str(&verified.user_id).map_err(|_| {
            tracing::warn!("[AuthGate] Token subject is not a user id: {}", verified.user_id);
            BackendError::invalid_token("token subject is not a user id")
        })?;

        let user = self.store.get_user(user_id).await?.ok_or_else(|| {
            tracing::warn!("[AuthGate] Token subject {} has no user record", user_id);
            BackendError::UserNotFound {
                user_id: user_id.to_string(),
            }
        })?;

        tracing::debug!("[AuthGate] Authenticated user {}", user.id);
        Ok(Identity {
            user,
            claims: verified.claims,
        })
    }
}
