//! Resolution of a physical card to the display name of its holder.
//!
//! The toggle endpoint receives a card id and a secret hash from the door
//! reader; an external member registry answers with the holder's name.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

/// Default deadline for one lookup request.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Default member registry endpoint.
pub const DEFAULT_REGISTRY_URL: &str = "https://manager.olografix.org/api/card/name";

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("card registry unreachable: {0}")]
    Unreachable(String),
    #[error("card registry responded with status {0}")]
    Rejected(u16),
    #[error("card lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Maps a card credential to a holder name.
#[async_trait]
pub trait CardNameResolver: Send + Sync {
    /// `Ok(None)` means the registry answered but gave no usable name.
    async fn resolve(&self, card_id: &str, hash: &str) -> Result<Option<String>, LookupError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    card_id: &'a str,
    hash: &'a str,
}

/// Resolver backed by the member registry's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpCardResolver {
    client: Client,
    url: String,
    api_token: String,
    timeout: Duration,
}

impl HttpCardResolver {
    pub fn new(
        url: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Unreachable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            api_token: api_token.into(),
            timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> LookupError {
        if err.is_timeout() {
            LookupError::Timeout(self.timeout)
        } else {
            LookupError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl CardNameResolver for HttpCardResolver {
    async fn resolve(&self, card_id: &str, hash: &str) -> Result<Option<String>, LookupError> {
        let card_id = normalize_card_id(card_id);
        let response = self
            .client
            .post(&self.url)
            .header("X-API-TOKEN", &self.api_token)
            .json(&LookupRequest {
                card_id: &card_id,
                hash,
            })
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Card registry answered {} for card {}", status, card_id);
            return Err(LookupError::Rejected(status.as_u16()));
        }

        match response.text().await {
            Ok(body) => Ok(display_name(&body)),
            Err(e) if e.is_timeout() => Err(LookupError::Timeout(self.timeout)),
            Err(e) => {
                debug!("Unreadable registry body: {}", e);
                Ok(None)
            }
        }
    }
}

/// Card ids are printed with dashes; the registry stores them without.
pub fn normalize_card_id(card_id: &str) -> String {
    card_id.replace('-', "")
}

/// First word of the registry answer, with quotes stripped.
pub fn display_name(body: &str) -> Option<String> {
    let cleaned = body.replace('"', "");
    cleaned
        .split(' ')
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_card_id() {
        assert_eq!(normalize_card_id("04-A2-19-7F"), "04A2197F");
        assert_eq!(normalize_card_id("plain"), "plain");
    }

    #[test]
    fn test_display_name_takes_first_word() {
        assert_eq!(display_name("\"Mario Rossi\""), Some("Mario".to_string()));
        assert_eq!(display_name("Luigi"), Some("Luigi".to_string()));
        assert_eq!(display_name("\"\""), None);
        assert_eq!(display_name(""), None);
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_upstream_failure() {
        // Port 9 on loopback refuses connections.
        let resolver = HttpCardResolver::new(
            "http://127.0.0.1:9/lookup",
            "token",
            Duration::from_secs(2),
        )
        .unwrap();

        let err = resolver.resolve("04-A2", "secret").await.unwrap_err();
        assert!(matches!(err, LookupError::Unreachable(_)));
    }
}
