//! API-key protection for state-changing routes.
//!
//! The key travels in the `X-API-KEY` header. Both modes check an
//! HMAC-SHA256 tag derived from the key, using the constant-time
//! verification of the `hmac` crate. In hashed mode only the tag of the
//! configured key is kept in memory.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use super::error::AppError;
use super::state::AppState;

pub const API_KEY_HEADER: &str = "X-API-KEY";

type HmacSha256 = Hmac<Sha256>;

/// Message authenticated with the API key to derive its tag.
const KEY_TAG_LABEL: &[u8] = b"sede-api-key-v1";

#[derive(Clone)]
pub enum ApiKeyVerifier {
    /// The configured key; its tag is derived per check.
    Plain(String),
    /// Tag of the configured key.
    Hashed([u8; 32]),
}

impl std::fmt::Debug for ApiKeyVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiKeyVerifier::Plain(_) => f.write_str("ApiKeyVerifier::Plain(..)"),
            ApiKeyVerifier::Hashed(_) => f.write_str("ApiKeyVerifier::Hashed(..)"),
        }
    }
}

impl ApiKeyVerifier {
    pub fn new(api_key: &str, hashed: bool) -> Self {
        if hashed {
            ApiKeyVerifier::Hashed(key_tag(api_key))
        } else {
            ApiKeyVerifier::Plain(api_key.to_string())
        }
    }

    /// An empty presented key never matches.
    pub fn verify(&self, presented: &str) -> bool {
        if presented.is_empty() {
            return false;
        }
        let expected = match self {
            ApiKeyVerifier::Plain(key) => key_tag(key),
            ApiKeyVerifier::Hashed(tag) => *tag,
        };
        match keyed_mac(presented) {
            Some(mac) => mac.verify_slice(&expected).is_ok(),
            None => false,
        }
    }
}

/// HMAC keyed with `key` over [`KEY_TAG_LABEL`].
fn keyed_mac(key: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).ok()?;
    mac.update(KEY_TAG_LABEL);
    Some(mac)
}

fn key_tag(key: &str) -> [u8; 32] {
    let mut tag = [0u8; 32];
    if let Some(mac) = keyed_mac(key) {
        tag.copy_from_slice(&mac.finalize().into_bytes());
    }
    tag
}

/// Rejects requests whose `X-API-KEY` does not match.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if presented.is_empty() {
        warn!(target: "security", "missing API key");
        return Err(AppError::Unauthorized);
    }
    if !state.auth.verify(presented) {
        warn!(target: "security", "API key mismatch");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
