use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::auth::repo_types::User;
use crate::state::AppState;

/// The opaque session key presented in the Authorization header.
pub struct BearerKey(pub String);

#[async_trait]
impl FromRequestParts<AppState> for BearerKey {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "missing Authorization header".into(),
            ))?;

        // Expect "Bearer <key>"
        let key = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "invalid auth scheme".into()))?;

        Ok(BearerKey(key.to_string()))
    }
}

/// Resolves the presented session key to the logged-in user. Every protected
/// route takes this extractor instead of repeating the lookup.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerKey(key) = BearerKey::from_request_parts(parts, state).await?;

        let user = state
            .auth
            .authenticate(&key)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "not authenticated".to_string()))?;

        Ok(CurrentUser(user))
    }
}
