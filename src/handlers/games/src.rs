use crate::{
    catalog::{fetch_games, filter_games, Game},
    config::{AppState, CatalogSource},
    utils::{http_err, HttpError},
};
use super::models::GamesParams;
use axum::{
    Json,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
};

async fn current_games(state: &AppState) -> Vec<Game> {
    match state.cfg.catalog.source {
        CatalogSource::Remote => fetch_games(&state.http, &state.cfg.catalog.remote_url).await,
        CatalogSource::Seed   => state.seed.games.clone(),
    }
}

pub async fn list_games_handler(
    State(state): State<AppState>,
    params: Result<Query<GamesParams>, QueryRejection>,
) -> Result<Json<Vec<Game>>, HttpError> {
    let Query(params) = params
        .map_err(|e| http_err(StatusCode::BAD_REQUEST, e.body_text()))?;

    let games = current_games(&state).await;
    Ok(Json(filter_games(games, params.category, params.q.as_deref())))
}

pub async fn hot_games_handler(State(state): State<AppState>) -> Json<Vec<Game>> {
    Json(state.seed.hot_games(&state.cfg.catalog.hot_ids))
}

pub async fn get_game_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Game>, HttpError> {
    current_games(&state)
        .await
        .into_iter()
        .find(|g| g.id == id)
        .map(Json)
        .ok_or_else(|| http_err(StatusCode::NOT_FOUND, "game not found"))
}
