use thiserror::Error;

/// Domain failures surfaced by the rating and settlement core.
#[derive(Debug, Error, PartialEq)]
pub enum LadderError {
    #[error("Cannot compute an average rating for an empty team")]
    EmptyTeam,

    #[error("Participant references unknown player {0}")]
    UnknownPlayer(i64),

    #[error("Invalid score {0}:{1} - scores must be non-negative integers")]
    InvalidScore(i64, i64),

    #[error("Match {0} has no settled result to revert")]
    NotSettled(i64),

    #[error("Match {0} not found")]
    MatchNotFound(i64),
}
