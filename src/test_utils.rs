//! Test helpers: a migrated throwaway database plus seed functions.

use chrono::{Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

/// Creates a fresh database with all migrations applied. The TempDir must be
/// kept alive for as long as the pool is used.
pub async fn create_test_db() -> (SqlitePool, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Memory)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options)
        .await
        .expect("Failed to create test database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    (pool, temp_dir)
}

pub async fn create_test_event(pool: &SqlitePool, name: &str, slug: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO events
             (id, name, slug, starts_at, venue_name, city, capacity, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(slug)
    .bind(now + Duration::days(30))
    .bind("Grand Hall")
    .bind("Yangon")
    .bind(Option::<i64>::None)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .expect("Failed to insert test event");

    id
}

pub async fn create_test_invite_link(
    pool: &SqlitePool,
    slug: &str,
    label: &str,
    event_ids: &[Uuid],
) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO invite_links (id, slug, label, notes, created_at, updated_at)
         VALUES (?, ?, ?, NULL, ?, ?)",
    )
    .bind(id)
    .bind(slug)
    .bind(label)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .expect("Failed to insert test invite link");

    for event_id in event_ids {
        sqlx::query("INSERT INTO invite_link_events (invite_link_id, event_id) VALUES (?, ?)")
            .bind(id)
            .bind(event_id)
            .execute(pool)
            .await
            .expect("Failed to link test event");
    }

    id
}

pub async fn create_test_faq(
    pool: &SqlitePool,
    question: &str,
    sort_order: i64,
    invite_link_id: Option<Uuid>,
) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO faqs
             (id, question, answer, color_hex_codes, sort_order, invite_link_id,
              created_at, updated_at)
         VALUES (?, ?, 'An answer.', NULL, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(question)
    .bind(sort_order)
    .bind(invite_link_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .expect("Failed to insert test FAQ");

    id
}
