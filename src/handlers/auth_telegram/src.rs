use crate::{
    config::AppState,
    handlers::session::{models::AuthResponse, session_response},
    session::{SessionUser, PROVIDER_TELEGRAM},
    utils::{auth_failed, HttpError},
};
use super::models::TelegramLoginReq;
use axum::{
    Json,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
};
use chrono::Utc;
use tracing::warn;

fn sign_in(state: &AppState, payload: &TelegramLoginReq) -> Result<Json<AuthResponse>, HttpError> {
    let who = state
        .verifier
        .verify(payload, Utc::now().timestamp())
        .map_err(|e| {
            warn!(reason = %format!("{e:#}"), "telegram sign-in rejected");
            auth_failed()
        })?;

    session_response(state, SessionUser {
        id:       who.id,
        name:     who.name,
        image:    Some(who.image),
        provider: PROVIDER_TELEGRAM.into(),
    })
}

pub async fn telegram_login_handler(
    State(state): State<AppState>,
    payload: Result<Json<TelegramLoginReq>, JsonRejection>,
) -> Result<Json<AuthResponse>, HttpError> {
    let Json(payload) = payload.map_err(|e| {
        warn!(reason = %e.body_text(), "telegram sign-in body unreadable");
        auth_failed()
    })?;
    sign_in(&state, &payload)
}

/// Redirect mode of the widget: the same fields arrive in the query string.
pub async fn telegram_callback_handler(
    State(state): State<AppState>,
    payload: Result<Query<TelegramLoginReq>, QueryRejection>,
) -> Result<Json<AuthResponse>, HttpError> {
    let Query(payload) = payload.map_err(|e| {
        warn!(reason = %e.body_text(), "telegram callback query unreadable");
        auth_failed()
    })?;
    sign_in(&state, &payload)
}
