use crate::{
    config::AppState,
    session::{decode_session, issue_session, SessionUser},
    utils::{http_err, HttpError},
};
use super::models::AuthResponse;
use axum::{
    Json,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
};
use chrono::Utc;
use tracing::{debug, error, info};

/// Signs a session for an identity that has already been verified.
pub fn session_response(state: &AppState, user: SessionUser) -> Result<Json<AuthResponse>, HttpError> {
    let token = issue_session(
        state.cfg.session_secret.as_deref(),
        &user,
        state.cfg.session_ttl_secs,
        Utc::now().timestamp(),
    )
    .map_err(|e| {
        error!(error = %format!("{e:#}"), "cannot sign session");
        http_err(StatusCode::INTERNAL_SERVER_ERROR, "session signing unavailable")
    })?;

    info!(user_id = %user.id, provider = %user.provider, "signed in");
    Ok(Json(AuthResponse { token, user }))
}

pub async fn session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionUser>, HttpError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| http_err(StatusCode::UNAUTHORIZED, "not signed in"))?;

    let claims = decode_session(state.cfg.session_secret.as_deref(), token).map_err(|e| {
        debug!(error = %format!("{e:#}"), "session token rejected");
        http_err(StatusCode::UNAUTHORIZED, "not signed in")
    })?;

    Ok(Json(claims.into()))
}
