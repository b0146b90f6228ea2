use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub starts_at: DateTime<Utc>,
    pub venue_name: String,
    pub city: String,
    pub capacity: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The guest-visible shape of an event, as exposed through invite links.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventSummary {
    pub id: Uuid,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub venue_name: String,
    pub city: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub slug: String,
    pub starts_at: DateTime<Utc>,
    pub venue_name: String,
    pub city: String,
    pub capacity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub venue_name: Option<String>,
    pub city: Option<String>,
    pub capacity: Option<i64>,
}
