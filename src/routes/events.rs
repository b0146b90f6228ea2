use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::middleware::AdminSession;
use crate::error::AppError;
use crate::models::event::{CreateEventRequest, Event, UpdateEventRequest};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/events", get(list_events).post(create_event))
        .route(
            "/api/admin/events/{id}",
            get(get_event).patch(update_event).delete(delete_event),
        )
}

async fn fetch_event(pool: &SqlitePool, id: Uuid) -> Result<Event, AppError> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))
}

async fn slug_taken(pool: &SqlitePool, slug: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
    let (count,): (i64,) = match exclude {
        Some(id) => {
            sqlx::query_as("SELECT COUNT(*) FROM events WHERE slug = ? AND id != ?")
                .bind(slug)
                .bind(id)
                .fetch_one(pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT COUNT(*) FROM events WHERE slug = ?")
                .bind(slug)
                .fetch_one(pool)
                .await?
        }
    };
    Ok(count > 0)
}

async fn list_events(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<Vec<Event>>, AppError> {
    let events = sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY starts_at")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(events))
}

async fn get_event(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, AppError> {
    Ok(Json(fetch_event(&state.db, id).await?))
}

async fn create_event(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(body): Json<CreateEventRequest>,
) -> Result<Json<Event>, AppError> {
    let slug = super::validate_slug(&body.slug)?;
    let name = body.name.trim().to_string();
    if name.is_empty() || body.venue_name.trim().is_empty() || body.city.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Name, venue and city are required".into(),
        ));
    }
    if slug_taken(&state.db, &slug, None).await? {
        return Err(AppError::Conflict("Slug already in use".into()));
    }

    let now = Utc::now();
    let event = sqlx::query_as::<_, Event>(
        "INSERT INTO events
             (id, name, slug, starts_at, venue_name, city, capacity, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&name)
    .bind(&slug)
    .bind(body.starts_at)
    .bind(body.venue_name.trim())
    .bind(body.city.trim())
    .bind(body.capacity)
    .bind(now)
    .bind(now)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(event))
}

async fn update_event(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateEventRequest>,
) -> Result<Json<Event>, AppError> {
    let existing = fetch_event(&state.db, id).await?;

    let slug = match body.slug {
        Some(s) => super::validate_slug(&s)?,
        None => existing.slug.clone(),
    };
    if slug != existing.slug && slug_taken(&state.db, &slug, Some(id)).await? {
        return Err(AppError::Conflict("Slug already in use".into()));
    }

    let name = body
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or(existing.name);
    let venue_name = body
        .venue_name
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(existing.venue_name);
    let city = body
        .city
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or(existing.city);
    let starts_at = body.starts_at.unwrap_or(existing.starts_at);
    let capacity = body.capacity.or(existing.capacity);

    let event = sqlx::query_as::<_, Event>(
        "UPDATE events SET name = ?, slug = ?, starts_at = ?, venue_name = ?, city = ?,
             capacity = ?, updated_at = ?
         WHERE id = ? RETURNING *",
    )
    .bind(&name)
    .bind(&slug)
    .bind(starts_at)
    .bind(&venue_name)
    .bind(&city)
    .bind(capacity)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(event))
}

async fn delete_event(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    // Responses referencing this event go with it (cascade), so make the
    // admin break the link deliberately when answers exist.
    let (response_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM rsvp_event_responses WHERE event_id = ?")
            .bind(id)
            .fetch_one(&state.db)
            .await?;
    if response_count > 0 {
        return Err(AppError::Conflict(
            "Event has RSVP responses and cannot be deleted".into(),
        ));
    }

    let result = sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Event not found".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}
