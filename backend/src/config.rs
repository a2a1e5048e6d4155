//! Application configuration.
//!
//! [`AppConfig`] is assembled once at startup (the server binary builds it
//! from CLI flags and environment variables), validated with
//! [`AppConfig::validate`] and then handed to the components that need it.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::services::card_lookup::{DEFAULT_LOOKUP_TIMEOUT, DEFAULT_REGISTRY_URL};
use crate::services::ledger::DEFAULT_LEDGER_TIMEOUT;
use crate::services::space_api::SpaceInfo;
use crate::services::toggle::DEFAULT_COOLDOWN;

/// Minimum API key length outside debug mode.
pub const MIN_API_KEY_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API key must be at least 16 characters in production")]
    WeakApiKey,
    #[error("invalid bind address '{0}'")]
    InvalidAddress(String),
    #[error("rate limit must allow at least one request per minute")]
    InvalidRateLimit,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SecurityConfig {
    pub api_key: String,
    /// Compare digests of the key instead of the key itself.
    pub hash_api_key: bool,
    pub allowed_origins: Vec<String>,
    pub debug: bool,
}

/// Member registry used to attribute toggles.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub url: String,
    pub api_token: String,
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REGISTRY_URL.to_string(),
            api_token: String::new(),
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: i64,
    pub thread_id: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 100,
            burst: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    /// `None` disables card lookups.
    pub upstream: Option<UpstreamConfig>,
    /// `None` disables notifications.
    pub telegram: Option<TelegramConfig>,
    pub space: SpaceInfo,
    pub rate_limit: RateLimitConfig,
    pub cooldown: Duration,
    pub ledger_timeout: Duration,
    pub ui_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            upstream: None,
            telegram: None,
            space: SpaceInfo::default(),
            rate_limit: RateLimitConfig::default(),
            cooldown: DEFAULT_COOLDOWN,
            ledger_timeout: DEFAULT_LEDGER_TIMEOUT,
            ui_dir: "./ui".to_string(),
        }
    }
}

impl AppConfig {
    /// Check invariants and normalize fields in place.
    ///
    /// Invalid CORS origins are dropped rather than rejected; the dropped
    /// entries are returned so the caller can log them.
    pub fn validate(&mut self) -> Result<Vec<String>, ConfigError> {
        if self.security.api_key.len() < MIN_API_KEY_LEN && !self.security.debug {
            return Err(ConfigError::WeakApiKey);
        }
        if self.rate_limit.requests_per_minute == 0 || self.rate_limit.burst == 0 {
            return Err(ConfigError::InvalidRateLimit);
        }
        self.server.socket_addr()?;

        let (valid, rejected): (Vec<String>, Vec<String>) = self
            .security
            .allowed_origins
            .drain(..)
            .partition(|origin| is_valid_origin(origin));
        self.security.allowed_origins = valid;
        Ok(rejected)
    }
}

/// Split a comma-separated origin list. Entries are kept verbatim, so
/// padded entries fail validation later.
pub fn parse_origin_list(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(str::to_string).collect()
}

/// An origin must be an absolute URL with a scheme and a host.
pub fn is_valid_origin(origin: &str) -> bool {
    if origin.trim() != origin {
        return false;
    }
    match Url::parse(origin) {
        Ok(url) => !url.scheme().is_empty() && url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}
