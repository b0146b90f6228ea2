pub mod admin_users;
pub mod auth;
pub mod dashboard;
pub mod events;
pub mod faqs;
pub mod invite_links;
pub mod photos;
pub mod rsvps;

use axum::Router;

use crate::error::AppError;
use crate::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(events::router())
        .merge(invite_links::router())
        .merge(rsvps::router())
        .merge(faqs::router())
        .merge(photos::router())
        .merge(admin_users::router())
        .merge(dashboard::router())
}

/// Slugs end up in URL path segments: lowercase alphanumerics and hyphens.
pub(crate) fn validate_slug(slug: &str) -> Result<String, AppError> {
    let slug = slug.trim().to_lowercase();
    if slug.is_empty() || slug.len() > 64 {
        return Err(AppError::BadRequest("Slug must be 1-64 characters".into()));
    }
    if !slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(AppError::BadRequest(
            "Slug may only contain letters, numbers and hyphens".into(),
        ));
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_normalized_and_validated() {
        assert_eq!(validate_slug(" Mandalay-And-Yangon ").unwrap(), "mandalay-and-yangon");
        assert!(validate_slug("").is_err());
        assert!(validate_slug("has spaces").is_err());
        assert!(validate_slug("unter_strich").is_err());
    }
}
