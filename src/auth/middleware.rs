use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

use super::jwt;

const COOKIE_NAME: &str = "token";

/// Verified admin session. Every admin-facing handler takes this extractor;
/// requests without a valid session cookie are rejected before the handler runs.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub admin_id: Uuid,
    pub email: String,
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized)?;

        let token = jar
            .get(COOKIE_NAME)
            .map(|c| c.value().to_string())
            .ok_or(AppError::Unauthorized)?;

        let claims = jwt::validate_token(&token, &state.config.jwt_secret)?;

        Ok(AdminSession {
            admin_id: claims.sub,
            email: claims.email,
        })
    }
}
