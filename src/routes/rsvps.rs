use std::collections::{HashMap, HashSet};

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::auth::middleware::AdminSession;
use crate::error::AppError;
use crate::models::rsvp::{
    EventResponseInput, EventResponseView, GuestSide, ResponseStatus, Rsvp, RsvpEditContext,
    RsvpResponse, SubmitRsvpRequest, UpdateRsvpRequest,
};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/rsvps", post(submit_rsvp))
        .route(
            "/api/rsvps/{edit_token}",
            get(fetch_rsvp_by_token).put(update_rsvp_by_token),
        )
        .route("/api/admin/rsvps", get(list_rsvps))
        .route("/api/admin/rsvps/export", get(export_rsvps))
        .route(
            "/api/admin/rsvps/{id}",
            get(get_rsvp).patch(admin_update_rsvp).delete(delete_rsvp),
        )
}

const EDIT_TOKEN_LEN: usize = 32;

/// Opaque credential returned at submission time; the only way a guest can
/// later retrieve or change their RSVP.
fn generate_edit_token() -> String {
    let mut rng = rand::thread_rng();
    (0..EDIT_TOKEN_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..36u8);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

struct GuestFields {
    name: String,
    phone: String,
    email: Option<String>,
    dietary_requirements: Option<String>,
    notes: Option<String>,
}

fn validate_guest_fields(
    name: String,
    phone: String,
    email: Option<String>,
    dietary_requirements: Option<String>,
    notes: Option<String>,
) -> Result<GuestFields, AppError> {
    let name = name.trim().to_string();
    let phone = phone.trim().to_string();
    if name.is_empty() || phone.is_empty() {
        return Err(AppError::BadRequest("Name and phone are required".into()));
    }

    let email = non_empty(email);
    if let Some(email) = &email {
        if !email.contains('@') {
            return Err(AppError::BadRequest("Invalid email address".into()));
        }
    }

    Ok(GuestFields {
        name,
        phone,
        email,
        dietary_requirements: non_empty(dietary_requirements),
        notes: non_empty(notes),
    })
}

struct NormalizedResponse {
    event_id: Uuid,
    status: ResponseStatus,
    plus_one: bool,
    plus_one_name: Option<String>,
    plus_one_relation: Option<String>,
}

/// Validate submitted responses against the link's visibility set and apply
/// the plus-one policy: plus_one collapses to a strict bool, and the name /
/// relation fields survive only while plus_one is true. A single response
/// outside the visibility set rejects the whole payload.
fn normalize_responses(
    responses: HashMap<Uuid, EventResponseInput>,
    allowed: &HashSet<Uuid>,
) -> Result<Vec<NormalizedResponse>, AppError> {
    let mut out = Vec::with_capacity(responses.len());
    for (event_id, input) in responses {
        if !allowed.contains(&event_id) {
            return Err(AppError::BadRequest(format!(
                "Event {event_id} is not part of this invite link"
            )));
        }

        let plus_one = input.plus_one.unwrap_or(false);
        let (plus_one_name, plus_one_relation) = if plus_one {
            (non_empty(input.plus_one_name), non_empty(input.plus_one_relation))
        } else {
            (None, None)
        };

        out.push(NormalizedResponse {
            event_id,
            status: input.status,
            plus_one,
            plus_one_name,
            plus_one_relation,
        });
    }
    Ok(out)
}

async fn allowed_event_ids(
    pool: &SqlitePool,
    invite_link_id: Uuid,
) -> Result<HashSet<Uuid>, AppError> {
    let events = super::invite_links::linked_events(pool, invite_link_id).await?;
    Ok(events.into_iter().map(|e| e.id).collect())
}

async fn insert_responses(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    rsvp_id: Uuid,
    responses: &[NormalizedResponse],
) -> Result<(), AppError> {
    for response in responses {
        sqlx::query(
            "INSERT INTO rsvp_event_responses
                 (id, rsvp_id, event_id, status, plus_one, plus_one_name, plus_one_relation)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(rsvp_id)
        .bind(response.event_id)
        .bind(&response.status)
        .bind(response.plus_one)
        .bind(&response.plus_one_name)
        .bind(&response.plus_one_relation)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn fetch_rsvp(pool: &SqlitePool, id: Uuid) -> Result<Rsvp, AppError> {
    sqlx::query_as::<_, Rsvp>("SELECT * FROM rsvps WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("RSVP not found".into()))
}

async fn fetch_responses(
    pool: &SqlitePool,
    rsvp_id: Uuid,
) -> Result<Vec<EventResponseView>, AppError> {
    let responses = sqlx::query_as::<_, EventResponseView>(
        "SELECT r.event_id, e.name AS event_name, r.status, r.plus_one,
                r.plus_one_name, r.plus_one_relation
         FROM rsvp_event_responses r
         JOIN events e ON e.id = r.event_id
         WHERE r.rsvp_id = ?
         ORDER BY e.starts_at",
    )
    .bind(rsvp_id)
    .fetch_all(pool)
    .await?;

    Ok(responses)
}

#[derive(Debug, FromRow)]
struct BatchResponseRow {
    rsvp_id: Uuid,
    event_id: Uuid,
    event_name: String,
    status: ResponseStatus,
    plus_one: bool,
    plus_one_name: Option<String>,
    plus_one_relation: Option<String>,
}

/// Batch-fetch responses for multiple RSVPs (admin list and export).
async fn fetch_responses_batch(
    pool: &SqlitePool,
    rsvp_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<EventResponseView>>, AppError> {
    if rsvp_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; rsvp_ids.len()].join(", ");
    let sql = format!(
        "SELECT r.rsvp_id, r.event_id, e.name AS event_name, r.status, r.plus_one,
                r.plus_one_name, r.plus_one_relation
         FROM rsvp_event_responses r
         JOIN events e ON e.id = r.event_id
         WHERE r.rsvp_id IN ({placeholders})
         ORDER BY e.starts_at"
    );

    let mut query = sqlx::query_as::<_, BatchResponseRow>(&sql);
    for id in rsvp_ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;

    let mut map: HashMap<Uuid, Vec<EventResponseView>> = HashMap::new();
    for row in rows {
        map.entry(row.rsvp_id).or_default().push(EventResponseView {
            event_id: row.event_id,
            event_name: row.event_name,
            status: row.status,
            plus_one: row.plus_one,
            plus_one_name: row.plus_one_name,
            plus_one_relation: row.plus_one_relation,
        });
    }
    Ok(map)
}

/// First-time submission: validate, normalize, persist the RSVP and its
/// response rows in one transaction, and mint the edit token.
pub(crate) async fn create_rsvp(
    pool: &SqlitePool,
    req: SubmitRsvpRequest,
) -> Result<RsvpResponse, AppError> {
    let guest = validate_guest_fields(
        req.name,
        req.phone,
        req.email,
        req.dietary_requirements,
        req.notes,
    )?;

    let link_exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM invite_links WHERE id = ?")
        .bind(req.invite_link_id)
        .fetch_optional(pool)
        .await?;
    if link_exists.is_none() {
        return Err(AppError::BadRequest("Invalid invite link".into()));
    }

    let allowed = allowed_event_ids(pool, req.invite_link_id).await?;
    let normalized = normalize_responses(req.event_responses, &allowed)?;

    let id = Uuid::new_v4();
    let edit_token = generate_edit_token();
    let side = req.side.unwrap_or(GuestSide::Other);
    let now = Utc::now();

    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO rsvps
             (id, name, phone, email, side, dietary_requirements, notes,
              edit_token, invite_link_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&guest.name)
    .bind(&guest.phone)
    .bind(&guest.email)
    .bind(&side)
    .bind(&guest.dietary_requirements)
    .bind(&guest.notes)
    .bind(&edit_token)
    .bind(req.invite_link_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    insert_responses(&mut tx, id, &normalized).await?;
    tx.commit().await?;

    let rsvp = fetch_rsvp(pool, id).await?;
    let responses = fetch_responses(pool, id).await?;
    Ok(rsvp.into_response(responses))
}

pub(crate) async fn rsvp_context_by_token(
    pool: &SqlitePool,
    token: &str,
) -> Result<RsvpEditContext, AppError> {
    // Wrong and unknown tokens are indistinguishable on purpose.
    let rsvp = sqlx::query_as::<_, Rsvp>("SELECT * FROM rsvps WHERE edit_token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("RSVP not found".into()))?;

    let events = super::invite_links::linked_events(pool, rsvp.invite_link_id).await?;
    let responses = fetch_responses(pool, rsvp.id).await?;
    Ok(RsvpEditContext {
        rsvp: rsvp.into_response(responses),
        events,
    })
}

/// Shared by the guest-token and admin edit paths. Re-validates against the
/// RSVP's original invite link and replaces the full response set
/// (delete + recreate) in one transaction, so omitting an event drops its
/// prior answer and two racing edits settle as last-writer-wins.
pub(crate) async fn update_rsvp(
    pool: &SqlitePool,
    rsvp: &Rsvp,
    req: UpdateRsvpRequest,
) -> Result<RsvpResponse, AppError> {
    let guest = validate_guest_fields(
        req.name,
        req.phone,
        req.email,
        req.dietary_requirements,
        req.notes,
    )?;

    let allowed = allowed_event_ids(pool, rsvp.invite_link_id).await?;
    let normalized = normalize_responses(req.event_responses, &allowed)?;

    let side = req.side.unwrap_or_else(|| rsvp.side.clone());

    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE rsvps SET name = ?, phone = ?, email = ?, side = ?,
             dietary_requirements = ?, notes = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&guest.name)
    .bind(&guest.phone)
    .bind(&guest.email)
    .bind(&side)
    .bind(&guest.dietary_requirements)
    .bind(&guest.notes)
    .bind(Utc::now())
    .bind(rsvp.id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM rsvp_event_responses WHERE rsvp_id = ?")
        .bind(rsvp.id)
        .execute(&mut *tx)
        .await?;
    insert_responses(&mut tx, rsvp.id, &normalized).await?;
    tx.commit().await?;

    let updated = fetch_rsvp(pool, rsvp.id).await?;
    let responses = fetch_responses(pool, rsvp.id).await?;
    Ok(updated.into_response(responses))
}

// --- Public handlers ---

async fn submit_rsvp(
    State(state): State<AppState>,
    Json(body): Json<SubmitRsvpRequest>,
) -> Result<Json<RsvpResponse>, AppError> {
    let rsvp = create_rsvp(&state.db, body).await?;
    Ok(Json(rsvp))
}

async fn fetch_rsvp_by_token(
    State(state): State<AppState>,
    Path(edit_token): Path<String>,
) -> Result<Json<RsvpEditContext>, AppError> {
    let context = rsvp_context_by_token(&state.db, &edit_token).await?;
    Ok(Json(context))
}

async fn update_rsvp_by_token(
    State(state): State<AppState>,
    Path(edit_token): Path<String>,
    Json(body): Json<UpdateRsvpRequest>,
) -> Result<Json<RsvpResponse>, AppError> {
    let rsvp = sqlx::query_as::<_, Rsvp>("SELECT * FROM rsvps WHERE edit_token = ?")
        .bind(&edit_token)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("RSVP not found".into()))?;

    let updated = update_rsvp(&state.db, &rsvp, body).await?;
    Ok(Json(updated))
}

// --- Admin handlers ---

#[derive(Debug, Deserialize)]
struct ListRsvpsParams {
    q: Option<String>,
    event_id: Option<Uuid>,
    status: Option<ResponseStatus>,
    side: Option<GuestSide>,
}

async fn list_rsvps(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(params): Query<ListRsvpsParams>,
) -> Result<Json<Vec<RsvpResponse>>, AppError> {
    let mut sql = String::from("SELECT * FROM rsvps WHERE 1=1");
    if params.event_id.is_some() || params.status.is_some() {
        sql.push_str(
            " AND EXISTS (SELECT 1 FROM rsvp_event_responses r WHERE r.rsvp_id = rsvps.id",
        );
        if params.event_id.is_some() {
            sql.push_str(" AND r.event_id = ?");
        }
        if params.status.is_some() {
            sql.push_str(" AND r.status = ?");
        }
        sql.push(')');
    }
    if params.side.is_some() {
        sql.push_str(" AND side = ?");
    }
    let search = params
        .q
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());
    if search.is_some() {
        sql.push_str(" AND (name LIKE ? OR email LIKE ? OR phone LIKE ?)");
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut query = sqlx::query_as::<_, Rsvp>(&sql);
    if let Some(event_id) = params.event_id {
        query = query.bind(event_id);
    }
    if let Some(status) = &params.status {
        query = query.bind(status);
    }
    if let Some(side) = &params.side {
        query = query.bind(side);
    }
    if let Some(q) = &search {
        let pattern = format!("%{q}%");
        query = query.bind(pattern.clone()).bind(pattern.clone()).bind(pattern);
    }
    let rsvps = query.fetch_all(&state.db).await?;

    let ids: Vec<Uuid> = rsvps.iter().map(|r| r.id).collect();
    let mut responses = fetch_responses_batch(&state.db, &ids).await?;

    Ok(Json(
        rsvps
            .into_iter()
            .map(|r| {
                let rs = responses.remove(&r.id).unwrap_or_default();
                r.into_response(rs)
            })
            .collect(),
    ))
}

async fn get_rsvp(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<RsvpResponse>, AppError> {
    let rsvp = fetch_rsvp(&state.db, id).await?;
    let responses = fetch_responses(&state.db, id).await?;
    Ok(Json(rsvp.into_response(responses)))
}

async fn admin_update_rsvp(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRsvpRequest>,
) -> Result<Json<RsvpResponse>, AppError> {
    let rsvp = fetch_rsvp(&state.db, id).await?;
    let updated = update_rsvp(&state.db, &rsvp, body).await?;
    Ok(Json(updated))
}

async fn delete_rsvp(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM rsvps WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("RSVP not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- CSV export ---

fn csv_escape(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_row(rsvp: &Rsvp, response: Option<&EventResponseView>) -> String {
    let opt = |v: &Option<String>| v.as_deref().unwrap_or("").to_string();
    let fields = [
        rsvp.name.clone(),
        rsvp.phone.clone(),
        opt(&rsvp.email),
        rsvp.side.as_str().to_string(),
        opt(&rsvp.dietary_requirements),
        opt(&rsvp.notes),
        response.map(|r| r.event_name.clone()).unwrap_or_default(),
        response.map(|r| r.status.as_str().to_string()).unwrap_or_default(),
        response
            .map(|r| if r.plus_one { "true" } else { "false" }.to_string())
            .unwrap_or_default(),
        response.map(|r| opt(&r.plus_one_name)).unwrap_or_default(),
        response.map(|r| opt(&r.plus_one_relation)).unwrap_or_default(),
        rsvp.created_at.to_rfc3339(),
    ];
    fields
        .iter()
        .map(|f| csv_escape(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// One row per event-response; guests who answered for no events still get a
/// single row with the event columns blank so the export covers everyone.
async fn export_rsvps(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<impl IntoResponse, AppError> {
    let rsvps = sqlx::query_as::<_, Rsvp>("SELECT * FROM rsvps ORDER BY created_at")
        .fetch_all(&state.db)
        .await?;

    let ids: Vec<Uuid> = rsvps.iter().map(|r| r.id).collect();
    let responses = fetch_responses_batch(&state.db, &ids).await?;

    let mut out = String::from(
        "name,phone,email,side,dietary_requirements,notes,event,status,plus_one,plus_one_name,plus_one_relation,submitted_at\n",
    );
    for rsvp in &rsvps {
        match responses.get(&rsvp.id) {
            Some(rows) if !rows.is_empty() => {
                for row in rows {
                    out.push_str(&csv_row(rsvp, Some(row)));
                    out.push('\n');
                }
            }
            _ => {
                out.push_str(&csv_row(rsvp, None));
                out.push('\n');
            }
        }
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"rsvps.csv\"",
            ),
        ],
        out,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_db, create_test_event, create_test_invite_link};

    fn response(status: ResponseStatus) -> EventResponseInput {
        EventResponseInput {
            status,
            plus_one: None,
            plus_one_name: None,
            plus_one_relation: None,
        }
    }

    fn submit_request(
        invite_link_id: Uuid,
        event_responses: HashMap<Uuid, EventResponseInput>,
    ) -> SubmitRsvpRequest {
        SubmitRsvpRequest {
            invite_link_id,
            name: "A".to_string(),
            phone: "123".to_string(),
            email: None,
            side: None,
            dietary_requirements: None,
            notes: None,
            event_responses,
        }
    }

    fn update_request(
        event_responses: HashMap<Uuid, EventResponseInput>,
    ) -> UpdateRsvpRequest {
        UpdateRsvpRequest {
            name: "A".to_string(),
            phone: "123".to_string(),
            email: None,
            side: None,
            dietary_requirements: None,
            notes: None,
            event_responses,
        }
    }

    async fn seed_two_event_link(pool: &SqlitePool) -> (Uuid, Uuid, Uuid) {
        let mandalay = create_test_event(pool, "Mandalay Reception", "mandalay").await;
        let yangon = create_test_event(pool, "Yangon Reception", "yangon").await;
        let link =
            create_test_invite_link(pool, "mandalay-and-yangon", "Family", &[mandalay, yangon])
                .await;
        (link, mandalay, yangon)
    }

    #[tokio::test]
    async fn submit_persists_responses_and_normalizes_plus_one() {
        let (pool, _tmp) = create_test_db().await;
        let (link, mandalay, yangon) = seed_two_event_link(&pool).await;

        let mut responses = HashMap::new();
        responses.insert(
            mandalay,
            EventResponseInput {
                status: ResponseStatus::Yes,
                plus_one: Some(true),
                plus_one_name: Some("B".to_string()),
                plus_one_relation: None,
            },
        );
        responses.insert(yangon, response(ResponseStatus::No));

        let rsvp = create_rsvp(&pool, submit_request(link, responses))
            .await
            .unwrap();

        assert_eq!(rsvp.responses.len(), 2);
        let mandalay_row = rsvp.responses.iter().find(|r| r.event_id == mandalay).unwrap();
        assert_eq!(mandalay_row.status, ResponseStatus::Yes);
        assert!(mandalay_row.plus_one);
        assert_eq!(mandalay_row.plus_one_name.as_deref(), Some("B"));

        let yangon_row = rsvp.responses.iter().find(|r| r.event_id == yangon).unwrap();
        assert_eq!(yangon_row.status, ResponseStatus::No);
        assert!(!yangon_row.plus_one);
        assert_eq!(yangon_row.plus_one_name, None);
    }

    #[tokio::test]
    async fn submit_discards_plus_one_name_when_plus_one_is_false() {
        let (pool, _tmp) = create_test_db().await;
        let (link, mandalay, _) = seed_two_event_link(&pool).await;

        let mut responses = HashMap::new();
        responses.insert(
            mandalay,
            EventResponseInput {
                status: ResponseStatus::Yes,
                plus_one: Some(false),
                plus_one_name: Some("Alex".to_string()),
                plus_one_relation: Some("friend".to_string()),
            },
        );

        let rsvp = create_rsvp(&pool, submit_request(link, responses))
            .await
            .unwrap();
        let row = &rsvp.responses[0];
        assert!(!row.plus_one);
        assert_eq!(row.plus_one_name, None);
        assert_eq!(row.plus_one_relation, None);
    }

    #[tokio::test]
    async fn submit_rejects_event_outside_visibility_set_and_persists_nothing() {
        let (pool, _tmp) = create_test_db().await;
        let (link, mandalay, _) = seed_two_event_link(&pool).await;
        let outsider = create_test_event(&pool, "Private Dinner", "private-dinner").await;

        let mut responses = HashMap::new();
        responses.insert(mandalay, response(ResponseStatus::Yes));
        responses.insert(outsider, response(ResponseStatus::Yes));

        let result = create_rsvp(&pool, submit_request(link, responses)).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let (rsvp_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rsvps")
            .fetch_one(&pool)
            .await
            .unwrap();
        let (response_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM rsvp_event_responses")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(rsvp_count, 0);
        assert_eq!(response_count, 0);
    }

    #[tokio::test]
    async fn submit_requires_name_and_phone() {
        let (pool, _tmp) = create_test_db().await;
        let (link, _, _) = seed_two_event_link(&pool).await;

        let mut req = submit_request(link, HashMap::new());
        req.name = "   ".to_string();
        let result = create_rsvp(&pool, req).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn submit_rejects_unknown_invite_link() {
        let (pool, _tmp) = create_test_db().await;
        seed_two_event_link(&pool).await;

        let result = create_rsvp(&pool, submit_request(Uuid::new_v4(), HashMap::new())).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn edit_token_round_trip_returns_submitted_fields() {
        let (pool, _tmp) = create_test_db().await;
        let (link, mandalay, yangon) = seed_two_event_link(&pool).await;

        let mut responses = HashMap::new();
        responses.insert(mandalay, response(ResponseStatus::Maybe));

        let mut req = submit_request(link, responses);
        req.email = Some("a@example.com".to_string());
        req.dietary_requirements = Some("vegetarian".to_string());
        let created = create_rsvp(&pool, req).await.unwrap();

        let context = rsvp_context_by_token(&pool, &created.edit_token).await.unwrap();
        assert_eq!(context.rsvp.id, created.id);
        assert_eq!(context.rsvp.name, "A");
        assert_eq!(context.rsvp.email.as_deref(), Some("a@example.com"));
        assert_eq!(context.rsvp.dietary_requirements.as_deref(), Some("vegetarian"));
        assert_eq!(context.rsvp.responses.len(), 1);
        // The edit form gets the full visibility set, answered or not.
        assert_eq!(context.events.len(), 2);
        assert!(context.events.iter().any(|e| e.id == yangon));
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let (pool, _tmp) = create_test_db().await;
        let result = rsvp_context_by_token(&pool, "nope").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_replaces_the_full_response_set() {
        let (pool, _tmp) = create_test_db().await;
        let (link, mandalay, yangon) = seed_two_event_link(&pool).await;

        let mut responses = HashMap::new();
        responses.insert(
            mandalay,
            EventResponseInput {
                status: ResponseStatus::Yes,
                plus_one: Some(true),
                plus_one_name: Some("B".to_string()),
                plus_one_relation: None,
            },
        );
        responses.insert(yangon, response(ResponseStatus::No));
        let created = create_rsvp(&pool, submit_request(link, responses))
            .await
            .unwrap();
        assert_eq!(created.responses.len(), 2);

        // Edit submits only Yangon: Mandalay's prior answer must be dropped.
        let rsvp = fetch_rsvp(&pool, created.id).await.unwrap();
        let mut edited = HashMap::new();
        edited.insert(yangon, response(ResponseStatus::Yes));
        let updated = update_rsvp(&pool, &rsvp, update_request(edited)).await.unwrap();

        assert_eq!(updated.responses.len(), 1);
        assert_eq!(updated.responses[0].event_id, yangon);
        assert_eq!(updated.responses[0].status, ResponseStatus::Yes);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rsvp_event_responses")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn update_is_idempotent() {
        let (pool, _tmp) = create_test_db().await;
        let (link, mandalay, _) = seed_two_event_link(&pool).await;

        let mut responses = HashMap::new();
        responses.insert(mandalay, response(ResponseStatus::Yes));
        let created = create_rsvp(&pool, submit_request(link, responses.clone()))
            .await
            .unwrap();

        let rsvp = fetch_rsvp(&pool, created.id).await.unwrap();
        let first = update_rsvp(&pool, &rsvp, update_request(responses.clone()))
            .await
            .unwrap();
        let second = update_rsvp(&pool, &rsvp, update_request(responses))
            .await
            .unwrap();

        assert_eq!(first.responses.len(), second.responses.len());
        assert_eq!(first.responses[0].event_id, second.responses[0].event_id);
        assert_eq!(first.responses[0].status, second.responses[0].status);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rsvp_event_responses")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn update_rejects_event_outside_the_original_visibility_set() {
        let (pool, _tmp) = create_test_db().await;
        let (link, mandalay, _) = seed_two_event_link(&pool).await;
        let outsider = create_test_event(&pool, "Private Dinner", "private-dinner").await;

        let mut responses = HashMap::new();
        responses.insert(mandalay, response(ResponseStatus::Yes));
        let created = create_rsvp(&pool, submit_request(link, responses))
            .await
            .unwrap();

        let rsvp = fetch_rsvp(&pool, created.id).await.unwrap();
        let mut edited = HashMap::new();
        edited.insert(outsider, response(ResponseStatus::Yes));
        let result = update_rsvp(&pool, &rsvp, update_request(edited)).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        // The prior response set survives the rejected edit.
        let remaining = fetch_responses(&pool, created.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].event_id, mandalay);
    }

    #[test]
    fn edit_tokens_are_long_lowercase_alphanumeric() {
        let token = generate_edit_token();
        assert_eq!(token.len(), EDIT_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(token, generate_edit_token());
    }

    #[test]
    fn csv_escape_quotes_when_needed() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("line\nbreak"), "\"line\nbreak\"");
    }
}
