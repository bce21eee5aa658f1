use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use crate::api::models::{CreatePlayerRequest, PlayerResponse, UpdatePlayerRequest};
use crate::database::{
    self,
    models::{SortColumn, SortOrder},
};

use super::{AppState, PlayerParams, error_response};

pub async fn get_players(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlayerParams>,
) -> impl IntoResponse {
    let sort_by = match params.sort_by.as_deref() {
        Some("name") => SortColumn::Name,
        Some("matchesPlayed") => SortColumn::MatchesPlayed,
        _ => SortColumn::Elo,
    };
    let order = match params.order.as_deref() {
        Some("asc") => SortOrder::Asc,
        _ => SortOrder::Desc,
    };

    let conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(e) => return error_response(e),
    };

    match database::players::list_all(&conn, &sort_by, &order) {
        Ok(players) => {
            let body: Vec<PlayerResponse> = players.into_iter().map(Into::into).collect();
            Json(body).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn create_player(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePlayerRequest>,
) -> impl IntoResponse {
    let conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(e) => return error_response(e),
    };

    let elo = request.elo.unwrap_or(state.config.rating.starter_rating);
    let result = database::players::insert_player(
        &conn,
        &request.name,
        elo,
        request.matches_played.unwrap_or(0),
        request.wins.unwrap_or(0),
    );

    match result {
        Ok(player) => (StatusCode::CREATED, Json(PlayerResponse::from(player))).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_player(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(e) => return error_response(e),
    };

    match database::players::find_by_id(&conn, id) {
        Ok(Some(player)) => Json(PlayerResponse::from(player)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Player not found").into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn update_player(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<UpdatePlayerRequest>,
) -> impl IntoResponse {
    let conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(e) => return error_response(e),
    };

    match database::players::find_by_id(&conn, id) {
        Ok(Some(_)) => {}
        Ok(None) => return (StatusCode::NOT_FOUND, "Player not found").into_response(),
        Err(e) => return error_response(e),
    }

    match database::players::update_profile(&conn, id, &request.name, request.elo) {
        Ok(player) => Json(PlayerResponse::from(player)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn delete_player(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(e) => return error_response(e),
    };

    match database::players::delete_player(&conn, id) {
        Ok(true) => (StatusCode::OK, "Player deleted").into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Player not found").into_response(),
        Err(e) => error_response(e),
    }
}
