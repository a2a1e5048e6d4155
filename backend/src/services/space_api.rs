//! SpaceAPI v15 status document.

use serde::{Deserialize, Serialize};

use crate::models::StatusEvent;

pub const API_COMPATIBILITY: &str = "15";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub lat: f64,
    pub lon: f64,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub description: String,
    pub url: String,
}

/// Static description of the space; only `state` changes between requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceInfo {
    pub space: String,
    pub logo: String,
    pub url: String,
    pub location: Location,
    pub state_message: String,
    pub contact: Contact,
    pub projects: Vec<String>,
    pub links: Vec<Link>,
}

impl Default for SpaceInfo {
    fn default() -> Self {
        Self {
            space: "Metro Olografix".to_string(),
            logo: "https://olografix.org/images/metro-dark.png".to_string(),
            url: "https://olografix.org".to_string(),
            location: Location {
                address: "Viale Marconi 278/1, 65127 Pescara, Italy".to_string(),
                lat: 44.989097,
                lon: 11.426034,
                timezone: "Europe/Rome".to_string(),
            },
            state_message: "Ci riuniamo ogni lunedì sera dalle 21:00".to_string(),
            contact: Contact {
                email: "info@olografix.org".to_string(),
                twitter: Some("@MetroOlografix".to_string()),
            },
            projects: vec!["https://github.com/Metro-Olografix".to_string()],
            links: vec![
                Link {
                    name: "MOCA - Metro Olografix Camp".to_string(),
                    description: "Il più grande campeggio hacker in Italia".to_string(),
                    url: "https://moca.olografix.org".to_string(),
                },
                Link {
                    name: "Wikipedia".to_string(),
                    description: "Pagina Wikipedia di Metro Olografix".to_string(),
                    url: "https://it.wikipedia.org/wiki/Metro_Olografix".to_string(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceState {
    /// `None` until the first event is recorded.
    pub open: Option<bool>,
    /// Unix seconds of the latest event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastchange: Option<i64>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceApiDocument {
    pub api_compatibility: Vec<String>,
    pub space: String,
    pub logo: String,
    pub url: String,
    pub location: Location,
    pub state: SpaceState,
    pub contact: Contact,
    pub projects: Vec<String>,
    pub links: Vec<Link>,
}

/// Build the public document from the space description and latest event.
pub fn build_document(info: &SpaceInfo, latest: Option<&StatusEvent>) -> SpaceApiDocument {
    SpaceApiDocument {
        api_compatibility: vec![API_COMPATIBILITY.to_string()],
        space: info.space.clone(),
        logo: info.logo.clone(),
        url: info.url.clone(),
        location: info.location.clone(),
        state: SpaceState {
            open: latest.map(|e| e.is_open),
            lastchange: latest.map(|e| e.timestamp.timestamp()),
            message: info.state_message.clone(),
        },
        contact: info.contact.clone(),
        projects: info.projects.clone(),
        links: info.links.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventId, NewStatusEvent};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_document_without_history() {
        let doc = build_document(&SpaceInfo::default(), None);
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["api_compatibility"], serde_json::json!(["15"]));
        assert_eq!(json["space"], "Metro Olografix");
        assert!(json["state"]["open"].is_null());
        assert!(json["state"].get("lastchange").is_none());
    }

    #[test]
    fn test_document_reflects_latest_event() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 3, 21, 5, 0).unwrap();
        let event = NewStatusEvent::new(true, ts).with_id(EventId(7));

        let doc = build_document(&SpaceInfo::default(), Some(&event));
        assert_eq!(doc.state.open, Some(true));
        assert_eq!(doc.state.lastchange, Some(ts.timestamp()));
        assert_eq!(doc.links.len(), 2);
    }
}
