use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GuestSide {
    Bride,
    Groom,
    Both,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Yes,
    No,
    Maybe,
}

impl GuestSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bride => "bride",
            Self::Groom => "groom",
            Self::Both => "both",
            Self::Other => "other",
        }
    }
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Maybe => "maybe",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Rsvp {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub side: GuestSide,
    pub dietary_requirements: Option<String>,
    pub notes: Option<String>,
    pub edit_token: String,
    pub invite_link_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One submitted per-event answer, as sent by the guest form.
/// Plus-one details are per-event: the same guest may bring a different
/// plus-one (or none) to different events.
#[derive(Debug, Clone, Deserialize)]
pub struct EventResponseInput {
    pub status: ResponseStatus,
    pub plus_one: Option<bool>,
    pub plus_one_name: Option<String>,
    pub plus_one_relation: Option<String>,
}

/// A stored per-event answer joined with the event name for display.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventResponseView {
    pub event_id: Uuid,
    pub event_name: String,
    pub status: ResponseStatus,
    pub plus_one: bool,
    pub plus_one_name: Option<String>,
    pub plus_one_relation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRsvpRequest {
    pub invite_link_id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub side: Option<GuestSide>,
    pub dietary_requirements: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub event_responses: HashMap<Uuid, EventResponseInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRsvpRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub side: Option<GuestSide>,
    pub dietary_requirements: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub event_responses: HashMap<Uuid, EventResponseInput>,
}

#[derive(Debug, Serialize)]
pub struct RsvpResponse {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub side: GuestSide,
    pub dietary_requirements: Option<String>,
    pub notes: Option<String>,
    pub edit_token: String,
    pub invite_link_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub responses: Vec<EventResponseView>,
}

/// Everything the guest edit form needs: the current RSVP plus the full
/// visibility set of its invite link, so unanswered events can be offered too.
#[derive(Debug, Serialize)]
pub struct RsvpEditContext {
    pub rsvp: RsvpResponse,
    pub events: Vec<super::event::EventSummary>,
}

impl Rsvp {
    pub fn into_response(self, responses: Vec<EventResponseView>) -> RsvpResponse {
        RsvpResponse {
            id: self.id,
            name: self.name,
            phone: self.phone,
            email: self.email,
            side: self.side,
            dietary_requirements: self.dietary_requirements,
            notes: self.notes,
            edit_token: self.edit_token,
            invite_link_id: self.invite_link_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            responses,
        }
    }
}
