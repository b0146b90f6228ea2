use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::middleware::AdminSession;
use crate::error::AppError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/dashboard", get(dashboard))
}

#[derive(Debug, Serialize)]
struct EventStats {
    event_id: Uuid,
    name: String,
    starts_at: DateTime<Utc>,
    capacity: Option<i64>,
    yes: i64,
    maybe: i64,
    no: i64,
    plus_ones: i64,
    /// Confirmed headcount: yes answers plus their plus-ones.
    attending: i64,
}

#[derive(Debug, Serialize)]
struct DashboardResponse {
    total_rsvps: i64,
    total_responses: i64,
    yes: i64,
    no: i64,
    maybe: i64,
    plus_ones: i64,
    events: Vec<EventStats>,
}

#[derive(Debug, FromRow)]
struct EventStatsRow {
    event_id: Uuid,
    name: String,
    starts_at: DateTime<Utc>,
    capacity: Option<i64>,
    yes: i64,
    maybe: i64,
    no: i64,
    plus_ones: i64,
}

async fn dashboard(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<DashboardResponse>, AppError> {
    let (total_rsvps,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rsvps")
        .fetch_one(&state.db)
        .await?;

    let totals: (i64, i64, i64, i64, i64) = sqlx::query_as(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'yes' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'no' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'maybe' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN plus_one THEN 1 ELSE 0 END), 0)
         FROM rsvp_event_responses",
    )
    .fetch_one(&state.db)
    .await?;

    let rows = sqlx::query_as::<_, EventStatsRow>(
        "SELECT e.id AS event_id, e.name, e.starts_at, e.capacity,
                COALESCE(SUM(CASE WHEN r.status = 'yes' THEN 1 ELSE 0 END), 0) AS yes,
                COALESCE(SUM(CASE WHEN r.status = 'maybe' THEN 1 ELSE 0 END), 0) AS maybe,
                COALESCE(SUM(CASE WHEN r.status = 'no' THEN 1 ELSE 0 END), 0) AS no,
                COALESCE(SUM(CASE WHEN r.status = 'yes' AND r.plus_one THEN 1 ELSE 0 END), 0) AS plus_ones
         FROM events e
         LEFT JOIN rsvp_event_responses r ON r.event_id = e.id
         GROUP BY e.id, e.name, e.starts_at, e.capacity
         ORDER BY e.starts_at",
    )
    .fetch_all(&state.db)
    .await?;

    let events = rows
        .into_iter()
        .map(|row| EventStats {
            attending: row.yes + row.plus_ones,
            event_id: row.event_id,
            name: row.name,
            starts_at: row.starts_at,
            capacity: row.capacity,
            yes: row.yes,
            maybe: row.maybe,
            no: row.no,
            plus_ones: row.plus_ones,
        })
        .collect();

    Ok(Json(DashboardResponse {
        total_rsvps,
        total_responses: totals.0,
        yes: totals.1,
        no: totals.2,
        maybe: totals.3,
        plus_ones: totals.4,
        events,
    }))
}
