use std::io::Cursor;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::middleware::AdminSession;
use crate::error::AppError;
use crate::models::photo::{Photo, PhotoResponse};
use crate::thumbnails;
use crate::AppState;

const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

const MAX_UPLOAD_SIZE: usize = 20 * 1024 * 1024; // 20 MB

fn extension_from_mime(mime: &str) -> &str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "bin",
    }
}

fn extract_image_dimensions(bytes: &[u8]) -> Option<(i32, i32)> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    let (w, h) = reader.into_dimensions().ok()?;
    Some((w as i32, h as i32))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/photos", get(list_photos))
        .route("/api/admin/photos", post(upload_photo))
        .route_layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .route("/api/admin/photos/reorder", put(reorder_photos))
        .route(
            "/api/admin/photos/{id}",
            axum::routing::patch(update_photo).delete(delete_photo),
        )
        .route(
            "/api/admin/photos/{id}/regenerate-thumbnail",
            post(regenerate_thumbnail),
        )
}

/// Generate and store the gallery thumbnail. Best-effort on upload: a photo
/// without a thumbnail is still served full-size.
async fn store_thumbnail(state: &AppState, file_name: &str, bytes: Vec<u8>) {
    let result = tokio::task::spawn_blocking(move || thumbnails::generate(&bytes)).await;
    match result {
        Ok(Ok(thumb_bytes)) => {
            let thumb_key = thumbnails::thumbnail_key(file_name);
            if let Err(e) = state.storage.put(&thumb_key, &thumb_bytes, "image/webp").await {
                tracing::warn!("Failed to store thumbnail: {e}");
            }
        }
        Ok(Err(e)) => tracing::warn!("Thumbnail generation failed: {e}"),
        Err(e) => tracing::warn!("Thumbnail task panicked: {e}"),
    }
}

// --- Public ---

async fn list_photos(State(state): State<AppState>) -> Result<Json<Vec<PhotoResponse>>, AppError> {
    let photos =
        sqlx::query_as::<_, Photo>("SELECT * FROM photos ORDER BY sort_order, created_at")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(
        photos
            .into_iter()
            .map(|p| p.into_response(&state.storage))
            .collect(),
    ))
}

// --- Admin ---

async fn upload_photo(
    State(state): State<AppState>,
    _admin: AdminSession,
    mut multipart: Multipart,
) -> Result<Json<PhotoResponse>, AppError> {
    let mut file_data: Option<(String, Vec<u8>)> = None;
    let mut caption: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            "file" => {
                let mime = field
                    .content_type()
                    .ok_or_else(|| AppError::BadRequest("File missing content type".into()))?
                    .to_string();

                if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
                    return Err(AppError::BadRequest(format!(
                        "Unsupported file type: {mime}"
                    )));
                }

                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;

                file_data = Some((mime, bytes.to_vec()));
            }
            "caption" => {
                caption = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read caption: {e}"))
                })?);
            }
            _ => {}
        }
    }

    let (mime, bytes) = file_data.ok_or_else(|| AppError::BadRequest("No file provided".into()))?;

    let ext = extension_from_mime(&mime);
    let file_name = format!("{}.{ext}", Uuid::new_v4());
    let file_size = bytes.len() as i64;

    state.storage.put(&file_name, &bytes, &mime).await?;

    let (width, height) = extract_image_dimensions(&bytes)
        .map(|(w, h)| (Some(w), Some(h)))
        .unwrap_or((None, None));

    store_thumbnail(&state, &file_name, bytes).await;

    let caption = caption.filter(|s| !s.trim().is_empty());
    let next_order: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(sort_order) + 1, 0) FROM photos")
            .fetch_one(&state.db)
            .await?;
    let now = Utc::now();

    let photo = sqlx::query_as::<_, Photo>(
        "INSERT INTO photos
             (id, caption, file_path, file_size, mime_type, width, height, sort_order,
              created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&caption)
    .bind(&file_name)
    .bind(file_size)
    .bind(&mime)
    .bind(width)
    .bind(height)
    .bind(next_order)
    .bind(now)
    .bind(now)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(photo.into_response(&state.storage)))
}

#[derive(Debug, Deserialize)]
struct UpdatePhotoRequest {
    caption: Option<String>,
}

async fn update_photo(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePhotoRequest>,
) -> Result<Json<PhotoResponse>, AppError> {
    let has_caption = body.caption.is_some();
    let caption = body.caption.filter(|s| !s.trim().is_empty());

    let photo = sqlx::query_as::<_, Photo>(
        "UPDATE photos SET
           caption = CASE WHEN ? THEN ? ELSE caption END,
           updated_at = ?
         WHERE id = ? RETURNING *",
    )
    .bind(has_caption)
    .bind(&caption)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Photo not found".into()))?;

    Ok(Json(photo.into_response(&state.storage)))
}

async fn delete_photo(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let photo = sqlx::query_as::<_, Photo>("DELETE FROM photos WHERE id = ? RETURNING *")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Photo not found".into()))?;

    // Blob cleanup is best-effort; the row is already gone.
    state.storage.delete(&photo.file_path).await;
    state
        .storage
        .delete(&thumbnails::thumbnail_key(&photo.file_path))
        .await;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ReorderRequest {
    ids: Vec<Uuid>,
}

async fn reorder_photos(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(body): Json<ReorderRequest>,
) -> Result<StatusCode, AppError> {
    let now = Utc::now();
    let mut tx = state.db.begin().await?;
    for (position, id) in body.ids.iter().enumerate() {
        let result =
            sqlx::query("UPDATE photos SET sort_order = ?, updated_at = ? WHERE id = ?")
                .bind(position as i64)
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::BadRequest(format!("Unknown photo id {id}")));
        }
    }
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn regenerate_thumbnail(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<PhotoResponse>, AppError> {
    let photo = sqlx::query_as::<_, Photo>("SELECT * FROM photos WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Photo not found".into()))?;

    let bytes = state.storage.get(&photo.file_path).await?;
    let thumb_bytes = tokio::task::spawn_blocking(move || thumbnails::generate(&bytes))
        .await
        .map_err(|e| AppError::Internal(format!("Thumbnail task panicked: {e}")))??;

    let thumb_key = thumbnails::thumbnail_key(&photo.file_path);
    state
        .storage
        .put(&thumb_key, &thumb_bytes, "image/webp")
        .await?;

    Ok(Json(photo.into_response(&state.storage)))
}
