use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde_json::json;

use crate::auth::middleware::AdminSession;
use crate::auth::{jwt, password};
use crate::error::AppError;
use crate::models::admin_user::{AdminUser, AdminUserResponse, LoginRequest};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AdminUserResponse>), AppError> {
    let email = body.email.trim().to_lowercase();

    let admin = sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !password::verify_password(&body.password, &admin.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let token = jwt::create_token(admin.id, &admin.email, &state.config.jwt_secret)?;
    let cookie = build_auth_cookie(token);

    Ok((jar.add(cookie), Json(AdminUserResponse::from(admin))))
}

async fn logout(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build("token").path("/"))
}

async fn me(session: AdminSession) -> Json<serde_json::Value> {
    Json(json!({ "id": session.admin_id, "email": session.email }))
}

fn build_auth_cookie(token: String) -> Cookie<'static> {
    Cookie::build(("token", token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(24))
        .build()
}
