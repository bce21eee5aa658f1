use chrono::NaiveDateTime;

use crate::rating::types::Team;

#[derive(Debug, Clone)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub elo: i64,
    pub matches_played: i64,
    pub wins: i64,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct Match {
    pub id: i64,
    pub date: NaiveDateTime,
    pub location: String,
    pub price: f64,
    pub score_a: Option<i64>,
    pub score_b: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
}

impl Match {
    pub fn has_result(&self) -> bool {
        self.score_a.is_some() && self.score_b.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Participant {
    pub id: i64,
    pub match_id: i64,
    pub player_id: i64,
    pub team: Team,
    pub paid: bool,
    pub elo_before: Option<i64>,
    pub elo_after: Option<i64>,
}

#[derive(Debug, Clone)]
pub enum SortColumn {
    Name,
    Elo,
    MatchesPlayed,
}

#[derive(Debug, Clone)]
pub enum SortOrder {
    Asc,
    Desc,
}
