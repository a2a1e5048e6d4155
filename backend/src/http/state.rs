//! Application state for the HTTP server.

use std::sync::Arc;

use super::auth::ApiKeyVerifier;
use super::rate_limit::RateLimiter;
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::db::repository::LedgerRepository;
use crate::services::card_lookup::CardNameResolver;
use crate::services::ledger::Ledger;
use crate::services::notification::NotificationDispatcher;
use crate::services::space_api::SpaceInfo;
use crate::services::statistics::StatisticsService;
use crate::services::toggle::ToggleService;

/// Outbound dependencies of the toggle; both optional.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub resolver: Option<Arc<dyn CardNameResolver>>,
    pub notifications: Option<NotificationDispatcher>,
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub ledger: Ledger,
    pub toggles: Arc<ToggleService>,
    pub stats: StatisticsService,
    pub space: Arc<SpaceInfo>,
    pub auth: Arc<ApiKeyVerifier>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wire the services over `repository`. `config` is expected to have
    /// passed [`AppConfig::validate`].
    pub fn new(
        config: AppConfig,
        repository: Arc<dyn LedgerRepository>,
        clock: Arc<dyn Clock>,
        collaborators: Collaborators,
    ) -> Self {
        let ledger = Ledger::new(repository).with_timeout(config.ledger_timeout);

        let mut toggles =
            ToggleService::new(ledger.clone(), clock.clone()).with_cooldown(config.cooldown);
        if let Some(resolver) = collaborators.resolver {
            toggles = toggles.with_resolver(resolver);
        }
        if let Some(dispatcher) = collaborators.notifications {
            toggles = toggles.with_notifications(dispatcher);
        }

        Self {
            stats: StatisticsService::new(ledger.clone(), clock),
            ledger,
            toggles: Arc::new(toggles),
            space: Arc::new(config.space.clone()),
            auth: Arc::new(ApiKeyVerifier::new(
                &config.security.api_key,
                config.security.hash_api_key,
            )),
            limiter: Arc::new(RateLimiter::new(
                config.rate_limit.requests_per_minute,
                config.rate_limit.burst,
            )),
            config: Arc::new(config),
        }
    }
}
