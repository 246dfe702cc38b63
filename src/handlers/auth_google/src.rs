use crate::{
    config::AppState,
    google::{authorize_url, exchange_code},
    handlers::session::{models::AuthResponse, session_response},
    session::{check_oauth_state, issue_oauth_state},
    utils::{auth_failed, http_err, HttpError},
};
use super::models::GoogleCallbackParams;
use axum::{
    Json,
    extract::{rejection::QueryRejection, Query, State},
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::warn;

const STATE_TTL_SECS: i64 = 600;

pub async fn google_login_handler(State(state): State<AppState>) -> Result<Response, HttpError> {
    let oauth_state = issue_oauth_state(
        state.cfg.session_secret.as_deref(),
        STATE_TTL_SECS,
        Utc::now().timestamp(),
    )
    .map_err(|e| {
        warn!(error = %format!("{e:#}"), "cannot start google sign-in");
        http_err(StatusCode::SERVICE_UNAVAILABLE, "google sign-in is not configured")
    })?;

    let url = authorize_url(&state.cfg.google, &oauth_state).map_err(|e| {
        warn!(error = %format!("{e:#}"), "cannot start google sign-in");
        http_err(StatusCode::SERVICE_UNAVAILABLE, "google sign-in is not configured")
    })?;

    Ok((StatusCode::FOUND, [(LOCATION, url)]).into_response())
}

pub async fn google_callback_handler(
    State(state): State<AppState>,
    params: Result<Query<GoogleCallbackParams>, QueryRejection>,
) -> Result<Json<AuthResponse>, HttpError> {
    let Query(params) = params.map_err(|_| auth_failed())?;

    if let Some(err) = params.error.as_deref() {
        warn!(error = err, "google sign-in declined");
        return Err(auth_failed());
    }
    let (Some(code), Some(oauth_state)) = (params.code.as_deref(), params.state.as_deref()) else {
        warn!("google callback without code or state");
        return Err(auth_failed());
    };

    check_oauth_state(state.cfg.session_secret.as_deref(), oauth_state).map_err(|e| {
        warn!(reason = %format!("{e:#}"), "google state rejected");
        auth_failed()
    })?;

    let profile = exchange_code(&state.http, &state.cfg.google, code)
        .await
        .map_err(|e| {
            warn!(reason = %format!("{e:#}"), "google code exchange failed");
            auth_failed()
        })?;

    session_response(&state, profile.into_session_user())
}
