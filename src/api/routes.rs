use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::api::handlers::{AppState, matches, players};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/players", get(players::get_players).post(players::create_player))
        .route(
            "/api/player/:id",
            get(players::get_player)
                .put(players::update_player)
                .delete(players::delete_player),
        )
        .route("/api/matches", get(matches::get_matches).post(matches::create_match))
        .route(
            "/api/match/:id",
            get(matches::get_match)
                .put(matches::update_match)
                .delete(matches::delete_match),
        )
        .route("/api/match/:id/payments", post(matches::update_payments))
        .route("/api/teams/balance", post(matches::balance))
        .with_state(state)
}
