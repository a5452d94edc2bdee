/**
 * Authentication Extractor
 *
 * REST handlers authenticate through the same `AuthGate` as sockets, so a
 * request is accepted exactly when a socket handshake with the same token
 * would be.
 */
use axum::{
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Uri},
};
use std::collections::HashMap;
use std::net::SocketAddr;

use crate::backend::auth::{Handshake, Identity};
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;

/// Build a handshake from request headers and query parameters
pub fn handshake_from_parts(
    headers: &HeaderMap,
    query: HashMap<String, String>,
    remote_addr: Option<SocketAddr>,
) -> Handshake {
    Handshake {
        auth_token: headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
        query,
        remote_addr,
    }
}

/// Decode query parameters the same way the socket upgrade's `Query` extractor does
pub fn query_from_uri(uri: &Uri) -> HashMap<String, String> {
    Query::<HashMap<String, String>>::try_from_uri(uri)
        .map(|Query(query)| query)
        .unwrap_or_default()
}

/// Authenticated caller of a REST endpoint
#[derive(Clone, Debug)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let handshake = handshake_from_parts(&parts.headers, query_from_uri(&parts.uri), None);
        let identity = state.services.gate.authenticate(&handshake).await.map_err(|e| {
            tracing::warn!("[Http] Rejected {} {}: {}", parts.method, parts.uri.path(), e.code());
            e
        })?;
        Ok(AuthUser(identity))
    }
}
