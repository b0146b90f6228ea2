use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::middleware::AdminSession;
use crate::error::AppError;
use crate::models::faq::{CreateFaqRequest, Faq, FaqResponse, UpdateFaqRequest};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/faqs", get(list_faqs))
        .route("/api/admin/faqs", get(list_all_faqs).post(create_faq))
        .route("/api/admin/faqs/reorder", put(reorder_faqs))
        .route("/api/admin/faqs/{id}", put(update_faq).delete(delete_faq))
}

/// Two-tier visibility: global FAQs (no invite link) always show, scoped
/// FAQs only for their link's slug. Unknown slugs degrade to global-only
/// rather than erroring, so stale links still render a usable page.
pub(crate) async fn faqs_visible_to_slug(
    pool: &SqlitePool,
    slug: Option<&str>,
) -> Result<Vec<Faq>, AppError> {
    let link_id: Option<Uuid> = match slug {
        Some(slug) => {
            sqlx::query_scalar("SELECT id FROM invite_links WHERE slug = ?")
                .bind(slug)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    let faqs = match link_id {
        Some(id) => {
            sqlx::query_as::<_, Faq>(
                "SELECT * FROM faqs
                 WHERE invite_link_id IS NULL OR invite_link_id = ?
                 ORDER BY sort_order, created_at",
            )
            .bind(id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Faq>(
                "SELECT * FROM faqs WHERE invite_link_id IS NULL ORDER BY sort_order, created_at",
            )
            .fetch_all(pool)
            .await?
        }
    };

    Ok(faqs)
}

/// Rewrite sort_order to each id's position in the submitted list, in one
/// transaction so a partially-reordered list is never visible.
pub(crate) async fn reorder(pool: &SqlitePool, ids: &[Uuid]) -> Result<(), AppError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;
    for (position, id) in ids.iter().enumerate() {
        let result = sqlx::query("UPDATE faqs SET sort_order = ?, updated_at = ? WHERE id = ?")
            .bind(position as i64)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::BadRequest(format!("Unknown FAQ id {id}")));
        }
    }
    tx.commit().await?;
    Ok(())
}

fn encode_colors(colors: &Option<Vec<String>>) -> Result<Option<String>, AppError> {
    colors
        .as_ref()
        .filter(|c| !c.is_empty())
        .map(|c| {
            serde_json::to_string(c)
                .map_err(|e| AppError::Internal(format!("Failed to encode colors: {e}")))
        })
        .transpose()
}

async fn check_invite_link_exists(
    pool: &SqlitePool,
    invite_link_id: Option<Uuid>,
) -> Result<(), AppError> {
    if let Some(id) = invite_link_id {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM invite_links WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;
        if count == 0 {
            return Err(AppError::BadRequest("Unknown invite link".into()));
        }
    }
    Ok(())
}

// --- Public ---

#[derive(Debug, Deserialize)]
struct ListFaqsParams {
    slug: Option<String>,
}

async fn list_faqs(
    State(state): State<AppState>,
    Query(params): Query<ListFaqsParams>,
) -> Result<Json<Vec<FaqResponse>>, AppError> {
    let faqs = faqs_visible_to_slug(&state.db, params.slug.as_deref()).await?;
    Ok(Json(faqs.into_iter().map(Faq::into_response).collect()))
}

// --- Admin ---

async fn list_all_faqs(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<Vec<FaqResponse>>, AppError> {
    let faqs = sqlx::query_as::<_, Faq>("SELECT * FROM faqs ORDER BY sort_order, created_at")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(faqs.into_iter().map(Faq::into_response).collect()))
}

async fn create_faq(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(body): Json<CreateFaqRequest>,
) -> Result<Json<FaqResponse>, AppError> {
    if body.question.trim().is_empty() || body.answer.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Question and answer are required".into(),
        ));
    }
    check_invite_link_exists(&state.db, body.invite_link_id).await?;

    let colors = encode_colors(&body.color_hex_codes)?;
    let now = Utc::now();

    // New FAQs append to the end of the admin-controlled order.
    let next_order: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(sort_order) + 1, 0) FROM faqs")
            .fetch_one(&state.db)
            .await?;

    let faq = sqlx::query_as::<_, Faq>(
        "INSERT INTO faqs
             (id, question, answer, color_hex_codes, sort_order, invite_link_id,
              created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(body.question.trim())
    .bind(body.answer.trim())
    .bind(&colors)
    .bind(next_order)
    .bind(body.invite_link_id)
    .bind(now)
    .bind(now)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(faq.into_response()))
}

async fn update_faq(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateFaqRequest>,
) -> Result<Json<FaqResponse>, AppError> {
    if body.question.trim().is_empty() || body.answer.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Question and answer are required".into(),
        ));
    }
    check_invite_link_exists(&state.db, body.invite_link_id).await?;

    let colors = encode_colors(&body.color_hex_codes)?;

    let faq = sqlx::query_as::<_, Faq>(
        "UPDATE faqs SET question = ?, answer = ?, color_hex_codes = ?,
             invite_link_id = ?, updated_at = ?
         WHERE id = ? RETURNING *",
    )
    .bind(body.question.trim())
    .bind(body.answer.trim())
    .bind(&colors)
    .bind(body.invite_link_id)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("FAQ not found".into()))?;

    Ok(Json(faq.into_response()))
}

async fn delete_faq(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM faqs WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("FAQ not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ReorderRequest {
    ids: Vec<Uuid>,
}

async fn reorder_faqs(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(body): Json<ReorderRequest>,
) -> Result<StatusCode, AppError> {
    reorder(&state.db, &body.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_db, create_test_faq, create_test_invite_link};

    #[tokio::test]
    async fn global_faqs_show_for_everyone_scoped_only_for_their_link() {
        let (pool, _tmp) = create_test_db().await;
        let link_a = create_test_invite_link(&pool, "family", "Family", &[]).await;
        let _link_b = create_test_invite_link(&pool, "friends", "Friends", &[]).await;

        let global = create_test_faq(&pool, "Where do I park?", 0, None).await;
        let scoped = create_test_faq(&pool, "Family dinner details?", 1, Some(link_a)).await;

        let no_slug = faqs_visible_to_slug(&pool, None).await.unwrap();
        assert_eq!(no_slug.len(), 1);
        assert_eq!(no_slug[0].id, global);

        let for_a = faqs_visible_to_slug(&pool, Some("family")).await.unwrap();
        assert_eq!(for_a.len(), 2);
        assert!(for_a.iter().any(|f| f.id == scoped));

        let for_b = faqs_visible_to_slug(&pool, Some("friends")).await.unwrap();
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].id, global);
    }

    #[tokio::test]
    async fn unknown_slug_degrades_to_global_only() {
        let (pool, _tmp) = create_test_db().await;
        let link = create_test_invite_link(&pool, "family", "Family", &[]).await;
        create_test_faq(&pool, "Global question", 0, None).await;
        create_test_faq(&pool, "Scoped question", 1, Some(link)).await;

        let unknown = faqs_visible_to_slug(&pool, Some("nonexistent-slug"))
            .await
            .unwrap();
        let global_only = faqs_visible_to_slug(&pool, None).await.unwrap();
        assert_eq!(unknown.len(), global_only.len());
        assert_eq!(unknown[0].id, global_only[0].id);
    }

    #[tokio::test]
    async fn faqs_come_back_in_sort_order() {
        let (pool, _tmp) = create_test_db().await;
        let second = create_test_faq(&pool, "Second", 5, None).await;
        let first = create_test_faq(&pool, "First", 1, None).await;

        let faqs = faqs_visible_to_slug(&pool, None).await.unwrap();
        assert_eq!(faqs[0].id, first);
        assert_eq!(faqs[1].id, second);
    }

    #[tokio::test]
    async fn reorder_rewrites_dense_positions() {
        let (pool, _tmp) = create_test_db().await;
        let a = create_test_faq(&pool, "A", 0, None).await;
        let b = create_test_faq(&pool, "B", 1, None).await;
        let c = create_test_faq(&pool, "C", 2, None).await;

        reorder(&pool, &[c, a, b]).await.unwrap();

        let faqs = faqs_visible_to_slug(&pool, None).await.unwrap();
        assert_eq!(faqs.iter().map(|f| f.id).collect::<Vec<_>>(), vec![c, a, b]);
        assert_eq!(
            faqs.iter().map(|f| f.sort_order).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[tokio::test]
    async fn reorder_with_unknown_id_changes_nothing() {
        let (pool, _tmp) = create_test_db().await;
        let a = create_test_faq(&pool, "A", 0, None).await;
        let b = create_test_faq(&pool, "B", 1, None).await;

        let result = reorder(&pool, &[b, Uuid::new_v4()]).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        // The transaction rolled back: original order intact.
        let faqs = faqs_visible_to_slug(&pool, None).await.unwrap();
        assert_eq!(faqs.iter().map(|f| f.id).collect::<Vec<_>>(), vec![a, b]);
    }
}
