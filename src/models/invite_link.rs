use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::event::EventSummary;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InviteLink {
    pub id: Uuid,
    pub slug: String,
    pub label: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin view of an invite link together with its visibility set.
#[derive(Debug, Serialize)]
pub struct InviteLinkResponse {
    pub id: Uuid,
    pub slug: String,
    pub label: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub events: Vec<EventSummary>,
}

/// What a guest sees after following an invite link.
#[derive(Debug, Serialize)]
pub struct ResolvedInviteLink {
    pub id: Uuid,
    pub slug: String,
    pub label: String,
    pub notes: Option<String>,
    pub events: Vec<EventSummary>,
}

impl InviteLink {
    pub fn into_response(self, events: Vec<EventSummary>) -> InviteLinkResponse {
        InviteLinkResponse {
            id: self.id,
            slug: self.slug,
            label: self.label,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            events,
        }
    }

    pub fn into_resolved(self, events: Vec<EventSummary>) -> ResolvedInviteLink {
        ResolvedInviteLink {
            id: self.id,
            slug: self.slug,
            label: self.label,
            notes: self.notes,
            events,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInviteLinkRequest {
    pub slug: String,
    pub label: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub event_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInviteLinkRequest {
    pub slug: Option<String>,
    pub label: Option<String>,
    pub notes: Option<String>,
    pub event_ids: Option<Vec<Uuid>>,
}
