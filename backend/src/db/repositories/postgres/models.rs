use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::sede_statuses;
use crate::models::{EventId, NewStatusEvent, StatusEvent};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sede_statuses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StatusRow {
    pub id: i64,
    pub is_open: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sede_statuses)]
pub struct NewStatusRow {
    pub is_open: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<StatusRow> for StatusEvent {
    fn from(row: StatusRow) -> Self {
        StatusEvent {
            id: EventId(row.id),
            is_open: row.is_open,
            timestamp: row.timestamp,
        }
    }
}

impl From<NewStatusEvent> for NewStatusRow {
    fn from(event: NewStatusEvent) -> Self {
        NewStatusRow {
            is_open: event.is_open,
            timestamp: event.timestamp,
        }
    }
}
