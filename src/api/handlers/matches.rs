use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::collections::HashSet;
use std::sync::Arc;

use crate::api::models::{
    BalanceRequest, BalanceResponse, CreateMatchRequest, MatchResponse, PaymentsRequest,
    PlayerResponse, UpdateMatchRequest,
};
use crate::database::{self, matches, players};
use crate::errors::LadderError;
use crate::rating::{self, types::MatchScore};
use crate::services::settlement::SettlementService;

use super::{AppState, error_response};

pub async fn get_matches(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(e) => return error_response(e),
    };

    let records = match matches::list_all(&conn) {
        Ok(records) => records,
        Err(e) => return error_response(e),
    };

    let mut body = Vec::with_capacity(records.len());
    for record in records {
        match matches::list_participants(&conn, record.id) {
            Ok(participants) => body.push(MatchResponse::build(record, participants)),
            Err(e) => return error_response(e),
        }
    }

    Json(body).into_response()
}

pub async fn create_match(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateMatchRequest>,
) -> impl IntoResponse {
    let mut conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(e) => return error_response(e),
    };

    let record =
        match matches::insert_match(&conn, request.date, &request.location, request.price) {
            Ok(record) => record,
            Err(e) => return error_response(e),
        };

    let settlement = SettlementService::new(&state.config);
    if let Err(e) = settlement.edit_roster(&mut conn, record.id, &request.team_a, &request.team_b)
    {
        // Roster rejected (e.g. unknown player): drop the half-created match.
        let _ = matches::delete_match_row(&conn, record.id);
        return error_response(e);
    }

    match_detail_response(&conn, record.id, StatusCode::CREATED)
}

pub async fn get_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(e) => return error_response(e),
    };

    match_detail_response(&conn, id, StatusCode::OK)
}

pub async fn update_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateMatchRequest>,
) -> impl IntoResponse {
    let mut conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(e) => return error_response(e),
    };

    match matches::find_by_id(&conn, id) {
        Ok(Some(_)) => {}
        Ok(None) => return (StatusCode::NOT_FOUND, "Match not found").into_response(),
        Err(e) => return error_response(e),
    }

    if let Err(e) = matches::update_details(&conn, id, request.date, &request.location, request.price)
    {
        return error_response(e);
    }

    let settlement = SettlementService::new(&state.config);
    if let Err(e) = settlement.edit_roster(&mut conn, id, &request.team_a, &request.team_b) {
        return error_response(e);
    }

    // Roster edits leave ratings alone; only an explicit result (re)applies
    // the settlement, and resubmitting the same score is a no-op.
    if let (Some(score_a), Some(score_b)) = (request.score_a, request.score_b) {
        let score = match MatchScore::new(score_a, score_b) {
            Ok(score) => score,
            Err(e) => return error_response(e.into()),
        };
        if let Err(e) = settlement.apply_result(&mut conn, id, score) {
            return error_response(e);
        }
    }

    match_detail_response(&conn, id, StatusCode::OK)
}

pub async fn delete_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let mut conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(e) => return error_response(e),
    };

    let settlement = SettlementService::new(&state.config);
    match settlement.delete_match(&mut conn, id) {
        Ok(()) => (StatusCode::OK, "Match deleted and settlement reverted").into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn update_payments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<PaymentsRequest>,
) -> impl IntoResponse {
    let mut conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(e) => return error_response(e),
    };

    let participants = match matches::list_participants(&conn, id) {
        Ok(participants) => participants,
        Err(e) => return error_response(e),
    };
    let known: HashSet<i64> = participants.iter().map(|p| p.id).collect();

    if let Some(update) = request
        .payments
        .iter()
        .find(|u| !known.contains(&u.participant_id))
    {
        return (
            StatusCode::NOT_FOUND,
            format!("Participant {} is not part of match {id}", update.participant_id),
        )
            .into_response();
    }

    let updates: Vec<(i64, bool)> = request
        .payments
        .iter()
        .map(|u| (u.participant_id, u.paid))
        .collect();
    if let Err(e) = matches::set_paid_many(&mut conn, &updates) {
        return error_response(e);
    }

    match_detail_response(&conn, id, StatusCode::OK)
}

pub async fn balance(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BalanceRequest>,
) -> impl IntoResponse {
    let conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(e) => return error_response(e),
    };

    let pool_players = match players::find_by_ids(&conn, &request.player_ids) {
        Ok(pool_players) => pool_players,
        Err(e) => return error_response(e),
    };

    let found: HashSet<i64> = pool_players.iter().map(|p| p.id).collect();
    if let Some(missing) = request.player_ids.iter().find(|id| !found.contains(id)) {
        return error_response(LadderError::UnknownPlayer(*missing).into());
    }

    let (team_a, team_b) = rating::balance_teams(&pool_players, &state.config.rating);
    let total_a: i64 = team_a.iter().map(|p| p.elo).sum();
    let total_b: i64 = team_b.iter().map(|p| p.elo).sum();

    Json(BalanceResponse {
        team_a: team_a.into_iter().map(PlayerResponse::from).collect(),
        team_b: team_b.into_iter().map(PlayerResponse::from).collect(),
        total_a,
        total_b,
    })
    .into_response()
}

fn match_detail_response(
    conn: &rusqlite::Connection,
    id: i64,
    status: StatusCode,
) -> axum::response::Response {
    let record = match matches::find_by_id(conn, id) {
        Ok(Some(record)) => record,
        Ok(None) => return (StatusCode::NOT_FOUND, "Match not found").into_response(),
        Err(e) => return error_response(e),
    };
    match matches::list_participants(conn, id) {
        Ok(participants) => {
            (status, Json(MatchResponse::build(record, participants))).into_response()
        }
        Err(e) => error_response(e),
    }
}
