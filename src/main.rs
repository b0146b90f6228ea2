mod auth;
mod config;
mod error;
mod models;
mod routes;
mod storage;
#[cfg(test)]
mod test_utils;
mod thumbnails;

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use clap::{Parser, Subcommand};
use config::Config;
use sqlx::SqlitePool;
use storage::StorageBackend;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub storage: StorageBackend,
}

#[derive(Parser)]
#[command(name = "wedding-backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Create an admin account (prompts for a password)
    CreateAdmin { email: String },
}

async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&state.db).await?;
    Ok(Json(serde_json::json!({ "status": "ok", "db": row.0 == 1 })))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();

    let db = SqlitePool::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!()
        .run(&db)
        .await
        .expect("failed to run migrations");

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::CreateAdmin { email } => create_admin(&db, &email).await,
        Command::Serve => serve(db, config).await,
    }
}

async fn create_admin(db: &SqlitePool, email: &str) {
    let email = email.trim().to_lowercase();
    let password = rpassword::prompt_password("Password: ").expect("failed to read password");
    if password.len() < 8 {
        eprintln!("Password must be at least 8 characters");
        std::process::exit(1);
    }

    let hash = auth::password::hash_password(&password).expect("failed to hash password");
    let now = chrono::Utc::now();

    let result = sqlx::query(
        "INSERT INTO admin_users (id, email, password_hash, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4())
    .bind(&email)
    .bind(&hash)
    .bind(now)
    .bind(now)
    .execute(db)
    .await;

    match result {
        Ok(_) => println!("Created admin {email}"),
        Err(e) => {
            eprintln!("Failed to create admin: {e}");
            std::process::exit(1);
        }
    }
}

async fn serve(db: SqlitePool, config: Config) {
    let storage = StorageBackend::from_config(&config);
    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState {
        db,
        config: Arc::new(config),
        storage,
    };

    let mut app = Router::new()
        .route("/api/health", get(health))
        .merge(routes::api_router());

    if let Some(upload_dir) = state.storage.local_upload_dir() {
        app = app.nest_service("/api/files", ServeDir::new(upload_dir));
    }
    if let Some(static_dir) = &state.config.static_dir {
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    let app = app
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
