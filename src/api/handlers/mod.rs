use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::config::settings::AppConfig;
use crate::database::DbPool;
use crate::errors::LadderError;

pub mod matches;
pub mod players;

pub struct AppState {
    pub pool: DbPool,
    pub config: AppConfig,
}

#[derive(Deserialize)]
pub struct PlayerParams {
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

/// Maps domain failures to client errors and everything else to a 500.
pub fn error_response(err: anyhow::Error) -> Response {
    let status = match err.downcast_ref::<LadderError>() {
        Some(LadderError::MatchNotFound(_) | LadderError::UnknownPlayer(_)) => {
            StatusCode::NOT_FOUND
        }
        Some(
            LadderError::InvalidScore(_, _) | LadderError::EmptyTeam | LadderError::NotSettled(_),
        ) => StatusCode::UNPROCESSABLE_ENTITY,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("Request failed: {:?}", err);
    }
    (status, err.to_string()).into_response()
}
