use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Faq {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    // JSON array of hex codes, decoded in into_response
    pub color_hex_codes: Option<String>,
    pub sort_order: i64,
    pub invite_link_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct FaqResponse {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub color_hex_codes: Option<Vec<String>>,
    pub sort_order: i64,
    pub invite_link_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Faq {
    pub fn into_response(self) -> FaqResponse {
        let color_hex_codes = self
            .color_hex_codes
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok());

        FaqResponse {
            id: self.id,
            question: self.question,
            answer: self.answer,
            color_hex_codes,
            sort_order: self.sort_order,
            invite_link_id: self.invite_link_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFaqRequest {
    pub question: String,
    pub answer: String,
    pub color_hex_codes: Option<Vec<String>>,
    pub invite_link_id: Option<Uuid>,
}

/// Full-replace update; the admin form always submits the whole FAQ,
/// which keeps "move back to global" expressible (invite_link_id = null).
#[derive(Debug, Deserialize)]
pub struct UpdateFaqRequest {
    pub question: String,
    pub answer: String,
    pub color_hex_codes: Option<Vec<String>>,
    pub invite_link_id: Option<Uuid>,
}
