use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::middleware::AdminSession;
use crate::auth::password;
use crate::error::AppError;
use crate::models::admin_user::{
    AdminUser, AdminUserResponse, ChangePasswordRequest, CreateAdminUserRequest,
};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list_admins).post(create_admin))
        .route("/api/admin/users/{id}", axum::routing::delete(delete_admin))
        .route("/api/admin/users/{id}/password", put(change_password))
}

const MIN_PASSWORD_LEN: usize = 8;

async fn list_admins(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<Vec<AdminUserResponse>>, AppError> {
    let admins =
        sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users ORDER BY created_at")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(admins.into_iter().map(AdminUserResponse::from).collect()))
}

async fn create_admin(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(body): Json<CreateAdminUserRequest>,
) -> Result<Json<AdminUserResponse>, AppError> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".into()));
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }

    let (existing,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM admin_users WHERE email = ?")
            .bind(&email)
            .fetch_one(&state.db)
            .await?;
    if existing > 0 {
        return Err(AppError::Conflict("Email already in use".into()));
    }

    let password_hash = password::hash_password(&body.password)?;
    let now = Utc::now();

    let admin = sqlx::query_as::<_, AdminUser>(
        "INSERT INTO admin_users (id, email, password_hash, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(&password_hash)
    .bind(now)
    .bind(now)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(AdminUserResponse::from(admin)))
}

async fn delete_admin(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admin_users")
        .fetch_one(&state.db)
        .await?;
    if total <= 1 {
        return Err(AppError::Conflict(
            "Cannot delete the last admin account".into(),
        ));
    }

    let result = sqlx::query("DELETE FROM admin_users WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Admin user not found".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn change_password(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }

    let password_hash = password::hash_password(&body.password)?;
    let result = sqlx::query(
        "UPDATE admin_users SET password_hash = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&password_hash)
    .bind(Utc::now())
    .bind(id)
    .execute(&state.db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Admin user not found".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}
