use crate::{
    config::AppState,
    utils::HttpError,
    validation::{game_title_options, prepare_request, validate_user_and_server, GameTitleOption, ValidationError},
};
use super::models::{ValidateUserReq, ValidateUserResp};
use axum::{
    Json,
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
};
use serde_json::json;
use tracing::{info, warn};

fn reply(e: ValidationError) -> HttpError {
    let status = StatusCode::from_u16(e.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut body = json!({
        "status":  "error",
        "code":    e.code,
        "message": e.message,
    });
    if let Some(errors) = e.errors {
        body["errors"] = errors;
    }
    (status, Json(body))
}

pub async fn validate_user_handler(
    State(state): State<AppState>,
    req: Result<Json<ValidateUserReq>, JsonRejection>,
) -> Result<Json<ValidateUserResp>, HttpError> {
    let Json(req) = req.map_err(|e| {
        reply(ValidationError {
            status:  StatusCode::BAD_REQUEST.as_u16(),
            code:    "INVALID_REQUEST".into(),
            message: e.body_text(),
            errors:  None,
        })
    })?;

    let wire = prepare_request(&req).map_err(reply)?;
    match validate_user_and_server(&state.http, &state.cfg.validation, &wire).await {
        Ok(resp) => {
            info!(game_title = %wire.game_title, "player id validated");
            Ok(Json(resp))
        }
        Err(e) => {
            warn!(game_title = %wire.game_title, code = %e.code, status = e.status, "player id validation failed");
            Err(reply(e))
        }
    }
}

// what the form offers in its game dropdown
pub async fn game_titles_handler() -> Json<Vec<GameTitleOption>> {
    Json(game_title_options())
}
