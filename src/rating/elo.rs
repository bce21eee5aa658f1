use log::debug;

use crate::config::settings::RatingSettings;
use crate::database::models::Player;
use crate::errors::LadderError;

use super::types::{MatchOutcome, MatchScore, RatingValue, Team};

/// Elo rating calculator. Stateless; every call works from the ratings it is
/// handed, so updates for the two teams are order-independent.
pub struct EloEngine {
    k_factor: f64,
}

impl EloEngine {
    pub fn new(settings: &RatingSettings) -> Self {
        Self {
            k_factor: settings.k_factor,
        }
    }

    /// Probability-like expected score in (0,1) for a player/team rated
    /// `rating` against `opponent_rating`.
    pub fn expected_score(&self, rating: RatingValue, opponent_rating: RatingValue) -> f64 {
        1.0 / (1.0 + 10f64.powf((opponent_rating - rating) / 400.0))
    }

    pub fn team_average_rating(&self, team: &[Player]) -> Result<RatingValue, LadderError> {
        if team.is_empty() {
            return Err(LadderError::EmptyTeam);
        }
        let sum: i64 = team.iter().map(|p| p.elo).sum();
        Ok(sum as f64 / team.len() as f64)
    }

    /// New rating after one result, rounded to the nearest integer for
    /// storage. `actual_score` is 1/0/0.5 for win/loss/draw.
    pub fn new_rating(
        &self,
        rating: RatingValue,
        opponent_rating: RatingValue,
        actual_score: f64,
    ) -> i64 {
        let expected = self.expected_score(rating, opponent_rating);
        (rating + self.k_factor * (actual_score - expected)).round() as i64
    }

    /// Applies a final score to both rosters and returns the updated copies.
    ///
    /// The expected score is computed once per team from the two pre-match
    /// averages, so every member of a team moves by the same delta. Deltas
    /// are not zero-sum once the teams differ in size. Winners get a win
    /// increment; draws increment only matches_played.
    pub fn update_match_ratings(
        &self,
        team_a: &[Player],
        team_b: &[Player],
        score: MatchScore,
    ) -> Result<(Vec<Player>, Vec<Player>), LadderError> {
        let avg_a = self.team_average_rating(team_a)?;
        let avg_b = self.team_average_rating(team_b)?;

        debug!(
            "Updating ratings: {} vs {} players, averages {:.1} vs {:.1}, score {}:{}",
            team_a.len(),
            team_b.len(),
            avg_a,
            avg_b,
            score.team_a,
            score.team_b
        );

        let updated_a = self.update_team(team_a, avg_a, avg_b, score.outcome_for(Team::A));
        let updated_b = self.update_team(team_b, avg_b, avg_a, score.outcome_for(Team::B));

        Ok((updated_a, updated_b))
    }

    fn update_team(
        &self,
        team: &[Player],
        own_avg: RatingValue,
        opponent_avg: RatingValue,
        outcome: MatchOutcome,
    ) -> Vec<Player> {
        let expected = self.expected_score(own_avg, opponent_avg);
        let delta = self.k_factor * (outcome.actual_score() - expected);
        team.iter()
            .map(|player| Player {
                elo: (player.elo as f64 + delta).round() as i64,
                matches_played: player.matches_played + 1,
                wins: player.wins + i64::from(outcome == MatchOutcome::Win),
                ..player.clone()
            })
            .collect()
    }
}
