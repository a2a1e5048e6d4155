//! The toggle protocol: a debounced flip of the open/closed state.
//!
//! A toggle reads the latest event, rejects the request while the cooldown
//! since that event is still running, optionally resolves who is toggling,
//! and appends the flipped state. Only one toggle runs at a time in this
//! process, and the append itself is conditional on the latest event not
//! having changed, so two callers can never both succeed inside one window.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use thiserror::Error;
use tokio::sync::Mutex;

use super::card_lookup::{CardNameResolver, LookupError};
use super::ledger::Ledger;
use super::notification::{state_change_message, NotificationDispatcher};
use crate::clock::Clock;
use crate::db::repository::RepositoryError;
use crate::models::{AppendOutcome, NewStatusEvent, StatusEvent};

/// Minimum time between two accepted toggles.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("Status can only be changed every {} seconds", .cooldown.as_secs())]
    CooldownActive { cooldown: Duration },
    #[error("upstream lookup failed: {0}")]
    UpstreamFailure(LookupError),
    /// A dependency did not answer within its deadline.
    #[error("deadline exceeded: {0}")]
    Timeout(String),
    #[error("storage failure: {0}")]
    Storage(RepositoryError),
}

impl From<RepositoryError> for ToggleError {
    fn from(err: RepositoryError) -> Self {
        if err.is_timeout() {
            ToggleError::Timeout(err.to_string())
        } else {
            ToggleError::Storage(err)
        }
    }
}

impl From<LookupError> for ToggleError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::Timeout(_) => ToggleError::Timeout(err.to_string()),
            other => ToggleError::UpstreamFailure(other),
        }
    }
}

/// Card credential presented by the door reader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardCredential {
    pub card_id: String,
    pub hash: String,
}

impl CardCredential {
    pub fn new(card_id: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            card_id: card_id.into(),
            hash: hash.into(),
        }
    }

    /// Lookups are only made when both parts are present.
    pub fn is_complete(&self) -> bool {
        !self.card_id.is_empty() && !self.hash.is_empty()
    }
}

/// Result of an accepted toggle.
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    pub event: StatusEvent,
    pub actor: Option<String>,
}

impl ToggleOutcome {
    pub fn is_open(&self) -> bool {
        self.event.is_open
    }
}

pub struct ToggleService {
    ledger: Ledger,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    resolver: Option<Arc<dyn CardNameResolver>>,
    notifications: Option<NotificationDispatcher>,
    writer: Mutex<()>,
}

impl ToggleService {
    pub fn new(ledger: Ledger, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            clock,
            cooldown: DEFAULT_COOLDOWN,
            resolver: None,
            notifications: None,
            writer: Mutex::new(()),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn CardNameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_notifications(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.notifications = Some(dispatcher);
        self
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Flip the state. The ledger is untouched on every error path.
    pub async fn toggle(
        &self,
        credential: Option<&CardCredential>,
    ) -> Result<ToggleOutcome, ToggleError> {
        let _writer = self.writer.lock().await;

        let now = self.clock.now();
        let latest = self.ledger.get_latest().await?;

        if let Some(ref latest) = latest {
            // Clock behind the ledger counts as zero elapsed.
            let elapsed = (now - latest.timestamp)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if elapsed < self.cooldown {
                return Err(ToggleError::CooldownActive {
                    cooldown: self.cooldown,
                });
            }
        }

        let actor = match (credential, &self.resolver) {
            (Some(card), Some(resolver)) if card.is_complete() => {
                match resolver.resolve(&card.card_id, &card.hash).await {
                    Ok(name) => name,
                    Err(e) => {
                        warn!("Card lookup failed, toggle aborted: {}", e);
                        return Err(e.into());
                    }
                }
            }
            _ => None,
        };

        let is_open = latest.as_ref().map(|e| !e.is_open).unwrap_or(true);
        let expected = latest.as_ref().map(|e| e.id);

        let event = match self
            .ledger
            .append_if_latest(expected, NewStatusEvent::new(is_open, now))
            .await
        {
            Ok(AppendOutcome::Appended(event)) => event,
            Ok(AppendOutcome::Stale(current)) => {
                warn!(
                    "Ledger moved during toggle (now at {:?}); rejecting",
                    current.map(|e| e.id)
                );
                return Err(ToggleError::CooldownActive {
                    cooldown: self.cooldown,
                });
            }
            Err(e) => {
                error!("Failed to append status event: {}", e);
                return Err(e.into());
            }
        };

        info!(
            "State changed to {} by {}",
            if event.is_open { "open" } else { "closed" },
            actor.as_deref().unwrap_or("anonymous")
        );

        if let Some(ref dispatcher) = self.notifications {
            dispatcher.dispatch(state_change_message(event.is_open, actor.as_deref()));
        }

        Ok(ToggleOutcome { event, actor })
    }
}
