//! Request and response bodies for the REST API.
//!
//! Statistics responses reuse the model types directly since they already
//! carry their wire format.

use serde::{Deserialize, Serialize};

pub use crate::models::{DailyStat, HourlyStat, StatsSummary, WeeklyStat};
pub use crate::services::space_api::SpaceApiDocument;
use crate::services::toggle::CardCredential;

/// Body of `POST /toggle`. Both fields may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    #[serde(default)]
    pub card_id: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
}

impl ToggleRequest {
    pub fn credential(&self) -> Option<CardCredential> {
        match (&self.card_id, &self.hash) {
            (None, None) => None,
            (card_id, hash) => Some(CardCredential::new(
                card_id.clone().unwrap_or_default(),
                hash.clone().unwrap_or_default(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub is_open: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}
