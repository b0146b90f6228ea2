use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::middleware::AdminSession;
use crate::error::AppError;
use crate::models::event::EventSummary;
use crate::models::invite_link::{
    CreateInviteLinkRequest, InviteLink, InviteLinkResponse, ResolvedInviteLink,
    UpdateInviteLinkRequest,
};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/invite-links/{slug}", get(resolve_invite_link))
        .route(
            "/api/admin/invite-links",
            get(list_invite_links).post(create_invite_link),
        )
        .route(
            "/api/admin/invite-links/{id}",
            get(get_invite_link)
                .patch(update_invite_link)
                .delete(delete_invite_link),
        )
}

/// The visibility set of an invite link: the events a guest who followed
/// that link may see and respond to. Submission and edit validation both
/// resolve through here so the UI and the server can never disagree.
pub async fn linked_events(
    pool: &SqlitePool,
    invite_link_id: Uuid,
) -> Result<Vec<EventSummary>, AppError> {
    let events = sqlx::query_as::<_, EventSummary>(
        "SELECT e.id, e.name, e.starts_at, e.venue_name, e.city
         FROM events e
         JOIN invite_link_events ile ON ile.event_id = e.id
         WHERE ile.invite_link_id = ?
         ORDER BY e.starts_at",
    )
    .bind(invite_link_id)
    .fetch_all(pool)
    .await?;

    Ok(events)
}

/// Replace the link's event set. Runs inside the caller's transaction so a
/// half-replaced set is never visible.
async fn replace_linked_events(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    invite_link_id: Uuid,
    event_ids: &[Uuid],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM invite_link_events WHERE invite_link_id = ?")
        .bind(invite_link_id)
        .execute(&mut **tx)
        .await?;

    for event_id in event_ids {
        let (exists,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events WHERE id = ?")
            .bind(event_id)
            .fetch_one(&mut **tx)
            .await?;
        if exists == 0 {
            return Err(AppError::BadRequest(format!("Unknown event id {event_id}")));
        }

        sqlx::query(
            "INSERT OR IGNORE INTO invite_link_events (invite_link_id, event_id) VALUES (?, ?)",
        )
        .bind(invite_link_id)
        .bind(event_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

async fn fetch_invite_link(pool: &SqlitePool, id: Uuid) -> Result<InviteLink, AppError> {
    sqlx::query_as::<_, InviteLink>("SELECT * FROM invite_links WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Invite link not found".into()))
}

async fn slug_taken(pool: &SqlitePool, slug: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
    let (count,): (i64,) = match exclude {
        Some(id) => {
            sqlx::query_as("SELECT COUNT(*) FROM invite_links WHERE slug = ? AND id != ?")
                .bind(slug)
                .bind(id)
                .fetch_one(pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT COUNT(*) FROM invite_links WHERE slug = ?")
                .bind(slug)
                .fetch_one(pool)
                .await?
        }
    };
    Ok(count > 0)
}

// --- Public ---

async fn resolve_invite_link(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ResolvedInviteLink>, AppError> {
    // Unknown slugs get a generic message; don't reveal whether the slug
    // ever existed.
    let link = sqlx::query_as::<_, InviteLink>("SELECT * FROM invite_links WHERE slug = ?")
        .bind(&slug)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invalid invite link".into()))?;

    let events = linked_events(&state.db, link.id).await?;
    Ok(Json(link.into_resolved(events)))
}

// --- Admin ---

async fn list_invite_links(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<Vec<InviteLinkResponse>>, AppError> {
    let links = sqlx::query_as::<_, InviteLink>("SELECT * FROM invite_links ORDER BY label")
        .fetch_all(&state.db)
        .await?;

    let mut out = Vec::with_capacity(links.len());
    for link in links {
        let events = linked_events(&state.db, link.id).await?;
        out.push(link.into_response(events));
    }
    Ok(Json(out))
}

async fn get_invite_link(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<InviteLinkResponse>, AppError> {
    let link = fetch_invite_link(&state.db, id).await?;
    let events = linked_events(&state.db, link.id).await?;
    Ok(Json(link.into_response(events)))
}

async fn create_invite_link(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(body): Json<CreateInviteLinkRequest>,
) -> Result<Json<InviteLinkResponse>, AppError> {
    let slug = super::validate_slug(&body.slug)?;
    let label = body.label.trim().to_string();
    if label.is_empty() {
        return Err(AppError::BadRequest("Label is required".into()));
    }
    if slug_taken(&state.db, &slug, None).await? {
        return Err(AppError::Conflict("Slug already in use".into()));
    }

    let id = Uuid::new_v4();
    let now = Utc::now();
    let notes = body.notes.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let mut tx = state.db.begin().await?;
    sqlx::query(
        "INSERT INTO invite_links (id, slug, label, notes, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&slug)
    .bind(&label)
    .bind(&notes)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    replace_linked_events(&mut tx, id, &body.event_ids).await?;
    tx.commit().await?;

    let link = fetch_invite_link(&state.db, id).await?;
    let events = linked_events(&state.db, id).await?;
    Ok(Json(link.into_response(events)))
}

async fn update_invite_link(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateInviteLinkRequest>,
) -> Result<Json<InviteLinkResponse>, AppError> {
    let existing = fetch_invite_link(&state.db, id).await?;

    let slug = match body.slug {
        Some(s) => super::validate_slug(&s)?,
        None => existing.slug.clone(),
    };
    if slug != existing.slug && slug_taken(&state.db, &slug, Some(id)).await? {
        return Err(AppError::Conflict("Slug already in use".into()));
    }

    let label = match body.label {
        Some(l) => {
            let l = l.trim().to_string();
            if l.is_empty() {
                return Err(AppError::BadRequest("Label is required".into()));
            }
            l
        }
        None => existing.label.clone(),
    };

    // Notes are full-replace: omitting them clears them.
    let notes = body.notes.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let mut tx = state.db.begin().await?;
    sqlx::query(
        "UPDATE invite_links SET slug = ?, label = ?, notes = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&slug)
    .bind(&label)
    .bind(&notes)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if let Some(event_ids) = &body.event_ids {
        replace_linked_events(&mut tx, id, event_ids).await?;
    }
    tx.commit().await?;

    let link = fetch_invite_link(&state.db, id).await?;
    let events = linked_events(&state.db, id).await?;
    Ok(Json(link.into_response(events)))
}

async fn delete_invite_link(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let (rsvp_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM rsvps WHERE invite_link_id = ?")
            .bind(id)
            .fetch_one(&state.db)
            .await?;
    if rsvp_count > 0 {
        return Err(AppError::Conflict(
            "Invite link has RSVPs and cannot be deleted".into(),
        ));
    }

    let result = sqlx::query("DELETE FROM invite_links WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Invite link not found".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_db, create_test_event, create_test_invite_link};

    #[tokio::test]
    async fn linked_events_returns_only_the_links_events() {
        let (pool, _tmp) = create_test_db().await;
        let mandalay = create_test_event(&pool, "Mandalay Reception", "mandalay").await;
        let yangon = create_test_event(&pool, "Yangon Reception", "yangon").await;
        let link = create_test_invite_link(&pool, "family", "Family", &[mandalay]).await;

        let events = linked_events(&pool, link).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, mandalay);
        assert!(events.iter().all(|e| e.id != yangon));
    }

    #[tokio::test]
    async fn replace_linked_events_rejects_unknown_event() {
        let (pool, _tmp) = create_test_db().await;
        let link = create_test_invite_link(&pool, "friends", "Friends", &[]).await;

        let mut tx = pool.begin().await.unwrap();
        let result = replace_linked_events(&mut tx, link, &[Uuid::new_v4()]).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn replace_linked_events_swaps_the_set() {
        let (pool, _tmp) = create_test_db().await;
        let a = create_test_event(&pool, "Ceremony", "ceremony").await;
        let b = create_test_event(&pool, "Dinner", "dinner").await;
        let link = create_test_invite_link(&pool, "both", "Both", &[a]).await;

        let mut tx = pool.begin().await.unwrap();
        replace_linked_events(&mut tx, link, &[b]).await.unwrap();
        tx.commit().await.unwrap();

        let events = linked_events(&pool, link).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, b);
    }
}
