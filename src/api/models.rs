use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::database::models::{Match, Participant, Player};
use crate::rating::types::Team;

#[derive(Debug, Serialize)]
pub struct PlayerResponse {
    pub id: i64,
    pub name: String,
    pub elo: i64,
    pub matches_played: i64,
    pub wins: i64,
}

impl From<Player> for PlayerResponse {
    fn from(player: Player) -> Self {
        Self {
            id: player.id,
            name: player.name,
            elo: player.elo,
            matches_played: player.matches_played,
            wins: player.wins,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePlayerRequest {
    pub name: String,
    pub elo: Option<i64>,
    pub matches_played: Option<i64>,
    pub wins: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlayerRequest {
    pub name: String,
    pub elo: i64,
}

#[derive(Debug, Serialize)]
pub struct ParticipantResponse {
    pub id: i64,
    pub player_id: i64,
    pub team: Team,
    pub paid: bool,
    pub elo_before: Option<i64>,
    pub elo_after: Option<i64>,
}

impl From<Participant> for ParticipantResponse {
    fn from(p: Participant) -> Self {
        Self {
            id: p.id,
            player_id: p.player_id,
            team: p.team,
            paid: p.paid,
            elo_before: p.elo_before,
            elo_after: p.elo_after,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub id: i64,
    pub date: NaiveDateTime,
    pub location: String,
    pub price: f64,
    pub score_a: Option<i64>,
    pub score_b: Option<i64>,
    pub price_per_player: f64,
    pub total_paid: f64,
    pub total_to_pay: f64,
    pub players: Vec<ParticipantResponse>,
}

impl MatchResponse {
    /// Splits the pitch price evenly and sums what the paid flags cover.
    pub fn build(record: Match, participants: Vec<Participant>) -> Self {
        let total_players = participants.len();
        let price_per_player = if total_players > 0 {
            record.price / total_players as f64
        } else {
            0.0
        };
        let total_paid = participants.iter().filter(|p| p.paid).count() as f64 * price_per_player;

        Self {
            id: record.id,
            date: record.date,
            location: record.location,
            price: record.price,
            score_a: record.score_a,
            score_b: record.score_b,
            price_per_player,
            total_paid,
            total_to_pay: record.price - total_paid,
            players: participants.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMatchRequest {
    pub date: NaiveDateTime,
    pub location: String,
    pub price: f64,
    pub team_a: Vec<i64>,
    pub team_b: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMatchRequest {
    pub date: NaiveDateTime,
    pub location: String,
    pub price: f64,
    pub team_a: Vec<i64>,
    pub team_b: Vec<i64>,
    pub score_a: Option<i64>,
    pub score_b: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentUpdate {
    pub participant_id: i64,
    pub paid: bool,
}

#[derive(Debug, Deserialize)]
pub struct PaymentsRequest {
    pub payments: Vec<PaymentUpdate>,
}

#[derive(Debug, Deserialize)]
pub struct BalanceRequest {
    pub player_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub team_a: Vec<PlayerResponse>,
    pub team_b: Vec<PlayerResponse>,
    pub total_a: i64,
    pub total_b: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn payment_summary_splits_price_evenly() {
        let record = Match {
            id: 1,
            date: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(22, 0, 0)
                .unwrap(),
            location: "Municipal pitch".to_string(),
            price: 40.0,
            score_a: None,
            score_b: None,
            created_at: None,
        };
        let participant = |id, paid| Participant {
            id,
            match_id: 1,
            player_id: id,
            team: Team::A,
            paid,
            elo_before: None,
            elo_after: None,
        };

        let response = MatchResponse::build(
            record.clone(),
            vec![
                participant(1, true),
                participant(2, true),
                participant(3, false),
                participant(4, false),
            ],
        );
        assert_eq!(response.price_per_player, 10.0);
        assert_eq!(response.total_paid, 20.0);
        assert_eq!(response.total_to_pay, 20.0);

        // No roster yet: nothing owed per player.
        let empty = MatchResponse::build(record, Vec::new());
        assert_eq!(empty.price_per_player, 0.0);
        assert_eq!(empty.total_to_pay, 40.0);
    }
}
