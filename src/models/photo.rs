use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::storage::StorageBackend;
use crate::thumbnails;

#[derive(Debug, Clone, FromRow)]
pub struct Photo {
    pub id: Uuid,
    pub caption: Option<String>,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PhotoResponse {
    pub id: Uuid,
    pub caption: Option<String>,
    pub file_url: String,
    pub thumbnail_url: String,
    pub file_size: i64,
    pub mime_type: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

impl Photo {
    pub fn into_response(self, storage: &StorageBackend) -> PhotoResponse {
        let file_url = storage.public_url(&self.file_path);
        let thumbnail_url = storage.public_url(&thumbnails::thumbnail_key(&self.file_path));

        PhotoResponse {
            id: self.id,
            caption: self.caption,
            file_url,
            thumbnail_url,
            file_size: self.file_size,
            mime_type: self.mime_type,
            width: self.width,
            height: self.height,
            sort_order: self.sort_order,
            created_at: self.created_at,
        }
    }
}
