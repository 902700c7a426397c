use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, SignUpRequest},
        error::AuthError,
        extractors::{BearerKey, CurrentUser},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn error_response(err: AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.to_string()),
        AuthError::DuplicateEmail => {
            (StatusCode::CONFLICT, "Email already registered".to_string())
        }
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "Invalid email or password.".to_string(),
        ),
        AuthError::NotAuthenticated => {
            (StatusCode::UNAUTHORIZED, "Not authenticated".to_string())
        }
        AuthError::CorruptCredential | AuthError::Internal(_) => {
            error!(error = %err, "internal auth failure");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    let user = state
        .auth
        .sign_up(&payload.full_name, &payload.email, &payload.password)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let session_key = state
        .auth
        .login(&payload.email, &payload.password)
        .await
        .map_err(error_response)?;

    // Resolve the identity through the same gate protected routes use.
    let user = state
        .auth
        .authenticate(&session_key)
        .await
        .map_err(error_response)?;

    Ok(Json(LoginResponse {
        session_key,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, key))]
pub async fn logout(
    State(state): State<AppState>,
    BearerKey(key): BearerKey,
) -> Result<StatusCode, (StatusCode, String)> {
    state.auth.logout(&key).await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(user))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(user))
}
