//! HTTP surface of the service.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                              │
//! │  - rate limit, CORS, security headers, API key           │
//! │  - JSON / text bodies, error mapping                     │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (services/)                               │
//! │  - ToggleService, StatisticsService, SpaceAPI document   │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Repository Layer (db/)                                  │
//! │  - LocalRepository / PostgresRepository                  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! | Route | Auth | Response |
//! |---|---|---|
//! | `GET /status` | - | `true` / `false` |
//! | `POST /toggle` | `X-API-KEY` | `{"isOpen": bool}` |
//! | `GET /stats` | - | weekly breakdown |
//! | `GET /stats/summary` | - | totals and daily series |
//! | `GET /spaceapi.json` | - | SpaceAPI v15 document |
//! | `GET /health` | - | store health |

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::{AppState, Collaborators};
