use serde::{Deserialize, Serialize};

use crate::errors::LadderError;

pub type PlayerId = i64;
pub type RatingValue = f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::A => "A",
            Team::B => "B",
        }
    }

    pub fn from_db(tag: &str) -> Option<Self> {
        match tag {
            "A" => Some(Team::A),
            "B" => Some(Team::B),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Win,
    Loss,
    Draw,
}

impl MatchOutcome {
    /// Actual score fed into the Elo update: 1 for a win, 0 for a loss,
    /// 0.5 for a draw (draws still move ratings when the averages differ).
    pub fn actual_score(&self) -> f64 {
        match self {
            MatchOutcome::Win => 1.0,
            MatchOutcome::Loss => 0.0,
            MatchOutcome::Draw => 0.5,
        }
    }
}

/// A validated final score pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchScore {
    pub team_a: i64,
    pub team_b: i64,
}

impl MatchScore {
    pub fn new(team_a: i64, team_b: i64) -> Result<Self, LadderError> {
        if team_a < 0 || team_b < 0 {
            return Err(LadderError::InvalidScore(team_a, team_b));
        }
        Ok(Self { team_a, team_b })
    }

    pub fn outcome_for(&self, team: Team) -> MatchOutcome {
        let (own, other) = match team {
            Team::A => (self.team_a, self.team_b),
            Team::B => (self.team_b, self.team_a),
        };
        match own.cmp(&other) {
            std::cmp::Ordering::Greater => MatchOutcome::Win,
            std::cmp::Ordering::Less => MatchOutcome::Loss,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
        }
    }

    /// None on a draw.
    pub fn winning_team(&self) -> Option<Team> {
        match self.outcome_for(Team::A) {
            MatchOutcome::Win => Some(Team::A),
            MatchOutcome::Loss => Some(Team::B),
            MatchOutcome::Draw => None,
        }
    }
}
