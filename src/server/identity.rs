use std::collections::HashMap;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use tracing::debug;

use super::state::ServerState;

pub const HEADER_AUTH_TOKEN_KEY: &str = "Authorization";

/// Maps a bearer token to the user it belongs to.
pub trait IdentityProvider: Send + Sync {
    fn resolve(&self, token: &str) -> Option<String>;
}

/// Fixed token -> user mapping loaded at startup.
pub struct StaticTokenIdentity {
    tokens: HashMap<String, String>,
}

impl StaticTokenIdentity {
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            tokens: pairs.into_iter().collect(),
        }
    }
}

impl IdentityProvider for StaticTokenIdentity {
    fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.get(token).cloned()
    }
}

/// The authenticated caller of a request.
#[derive(Debug)]
pub struct Identity {
    pub user_id: String,
}

pub enum IdentityExtractionError {
    AccessDenied,
}

impl IntoResponse for IdentityExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            IdentityExtractionError::AccessDenied => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

fn extract_identity_from_request_parts(parts: &mut Parts, ctx: &ServerState) -> Option<Identity> {
    let token = parts
        .headers
        .get(HEADER_AUTH_TOKEN_KEY)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).to_string())?;

    match ctx.identity_provider.resolve(&token) {
        Some(user_id) => {
            debug!("Resolved token to user {}", user_id);
            Some(Identity { user_id })
        }
        None => {
            debug!("Unknown auth token");
            None
        }
    }
}

impl FromRequestParts<ServerState> for Identity {
    type Rejection = IdentityExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_identity_from_request_parts(parts, ctx)
            .ok_or(IdentityExtractionError::AccessDenied)
    }
}
