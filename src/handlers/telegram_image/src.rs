use crate::{
    avatar::{resolve_avatar, CACHE_CONTROL},
    config::AppState,
};
use super::models::AvatarParams;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

// plain-text errors: the browser asked for an image, not JSON
pub async fn telegram_image_handler(
    State(state): State<AppState>,
    params: Result<Query<AvatarParams>, QueryRejection>,
) -> Response {
    let params = params.map(|Query(p)| p).unwrap_or_default();
    let id = params.id.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let configured = state
        .cfg
        .telegram
        .bot_token
        .as_deref()
        .is_some_and(|t| !t.is_empty());

    let Some(id) = id.filter(|_| configured) else {
        return (StatusCode::BAD_REQUEST, "Missing parameters").into_response();
    };

    match resolve_avatar(&state.http, &state.cfg.telegram, id, params.url.as_deref()).await {
        Some(img) => (
            [
                (header::CONTENT_TYPE, img.content_type),
                (header::CACHE_CONTROL, CACHE_CONTROL.to_string()),
            ],
            img.bytes,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Profile photo not found").into_response(),
    }
}
