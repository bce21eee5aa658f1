use std::collections::{HashMap, HashSet};

use anyhow::Result;
use log::info;
use rusqlite::Connection;

use crate::config::settings::AppConfig;
use crate::database::models::{Match, Participant, Player};
use crate::database::{matches, players};
use crate::errors::LadderError;
use crate::rating::types::{MatchScore, Team};
use crate::rating::EloEngine;

/// Applies match results to player ratings and undoes them again.
///
/// Every public operation runs as a single SQLite transaction, so a failure
/// partway through (unknown player, storage error) leaves no participant
/// half-updated. Reverts restore the stored `elo_before` snapshots rather
/// than inverting the Elo formula; when matches are deleted out of
/// chronological order this can over- or under-correct drift from later
/// matches, which is the documented behavior.
pub struct SettlementService {
    engine: EloEngine,
}

impl SettlementService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            engine: EloEngine::new(&config.rating),
        }
    }

    /// Settles `score` against the match. Resubmitting an identical result
    /// is a no-op; a different result reverts the old settlement first and
    /// computes fresh deltas from the players' current ratings.
    pub fn apply_result(
        &self,
        conn: &mut Connection,
        match_id: i64,
        score: MatchScore,
    ) -> Result<()> {
        let tx = conn.transaction()?;

        let record = load_match(&tx, match_id)?;
        // The no-op shortcut requires an intact settlement: stored score equal
        // and a snapshot for every current participant.
        if stored_score(&record) == Some(score)
            && matches::list_participants(&tx, match_id)?
                .iter()
                .all(|p| p.elo_before.is_some())
        {
            info!("Match {match_id} already settled with {}:{}, nothing to do", score.team_a, score.team_b);
            return Ok(());
        }

        if record.has_result() {
            self.revert_in_tx(&tx, &record)?;
        }
        self.settle_in_tx(&tx, match_id, score)?;

        tx.commit()?;
        info!("Match {match_id} settled with result {}:{}", score.team_a, score.team_b);
        Ok(())
    }

    /// Restores every participant to the snapshot taken when the result was
    /// applied and marks the match unplayed again.
    pub fn revert(&self, conn: &mut Connection, match_id: i64) -> Result<()> {
        let tx = conn.transaction()?;

        let record = load_match(&tx, match_id)?;
        self.revert_in_tx(&tx, &record)?;

        tx.commit()?;
        info!("Match {match_id} settlement reverted");
        Ok(())
    }

    /// Removes the match and its participants, reverting the settlement
    /// first if one is outstanding.
    pub fn delete_match(&self, conn: &mut Connection, match_id: i64) -> Result<()> {
        let tx = conn.transaction()?;

        let record = load_match(&tx, match_id)?;
        if record.has_result() {
            self.revert_in_tx(&tx, &record)?;
        }
        matches::delete_participants(&tx, match_id)?;
        matches::delete_match_row(&tx, match_id)?;

        tx.commit()?;
        info!("Match {match_id} deleted");
        Ok(())
    }

    /// Replaces the match rosters. Payment flags are kept only for players
    /// staying on the same team. Changing the roster of a settled match
    /// reverts the settlement first, while the old snapshots are still
    /// valid, and leaves the match unplayed; callers re-apply the result to
    /// rate the new roster. A roster identical to the stored one keeps the
    /// settlement untouched.
    pub fn edit_roster(
        &self,
        conn: &mut Connection,
        match_id: i64,
        team_a: &[i64],
        team_b: &[i64],
    ) -> Result<()> {
        let tx = conn.transaction()?;

        let record = load_match(&tx, match_id)?;
        let previous: HashMap<(i64, Team), Participant> = matches::list_participants(&tx, match_id)?
            .into_iter()
            .map(|p| ((p.player_id, p.team), p))
            .collect();

        let requested: HashSet<(i64, Team)> = team_a
            .iter()
            .map(|&id| (id, Team::A))
            .chain(team_b.iter().map(|&id| (id, Team::B)))
            .collect();
        let roster_changed =
            requested.len() != previous.len() || !requested.iter().all(|k| previous.contains_key(k));

        if record.has_result() && roster_changed {
            self.revert_in_tx(&tx, &record)?;
        }

        matches::delete_participants(&tx, match_id)?;

        for (team, roster) in [(Team::A, team_a), (Team::B, team_b)] {
            for &player_id in roster {
                if players::find_by_id(&tx, player_id)?.is_none() {
                    return Err(LadderError::UnknownPlayer(player_id).into());
                }

                let kept = previous.get(&(player_id, team));
                let paid = kept.map(|p| p.paid).unwrap_or(false);
                let inserted = matches::insert_participant(&tx, match_id, player_id, team, paid)?;

                // Snapshots survive only an unchanged roster; any real edit
                // reverted the settlement above.
                if let (
                    false,
                    Some(Participant {
                        elo_before: Some(before),
                        elo_after: Some(after),
                        ..
                    }),
                ) = (roster_changed, kept)
                {
                    matches::set_rating_snapshot(&tx, inserted.id, *before, *after)?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn settle_in_tx(&self, tx: &Connection, match_id: i64, score: MatchScore) -> Result<()> {
        let participants = matches::list_participants(tx, match_id)?;
        let (team_a, team_b) = load_rosters(tx, &participants)?;

        let (updated_a, updated_b) = self.engine.update_match_ratings(&team_a, &team_b, score)?;

        let before: HashMap<i64, i64> = team_a
            .iter()
            .chain(team_b.iter())
            .map(|p| (p.id, p.elo))
            .collect();
        let after: HashMap<i64, i64> = updated_a
            .iter()
            .chain(updated_b.iter())
            .map(|p| (p.id, p.elo))
            .collect();

        for player in updated_a.iter().chain(updated_b.iter()) {
            players::update_stats(tx, player)?;
        }
        for participant in &participants {
            matches::set_rating_snapshot(
                tx,
                participant.id,
                before[&participant.player_id],
                after[&participant.player_id],
            )?;
        }
        matches::set_result(tx, match_id, score.team_a, score.team_b)?;

        Ok(())
    }

    fn revert_in_tx(&self, tx: &Connection, record: &Match) -> Result<()> {
        let score = stored_score(record).ok_or(LadderError::NotSettled(record.id))?;
        let winning_team = score.winning_team();

        for participant in matches::list_participants(tx, record.id)? {
            let elo_before = participant
                .elo_before
                .ok_or(LadderError::NotSettled(record.id))?;

            let player = players::find_by_id(tx, participant.player_id)?
                .ok_or(LadderError::UnknownPlayer(participant.player_id))?;

            let won = winning_team == Some(participant.team);
            let restored = Player {
                elo: elo_before,
                matches_played: player.matches_played - 1,
                wins: player.wins - i64::from(won),
                ..player
            };
            players::update_stats(tx, &restored)?;
        }

        matches::clear_rating_snapshots(tx, record.id)?;
        matches::clear_result(tx, record.id)?;

        Ok(())
    }
}

fn load_match(conn: &Connection, match_id: i64) -> Result<Match> {
    matches::find_by_id(conn, match_id)?
        .ok_or_else(|| LadderError::MatchNotFound(match_id).into())
}

fn stored_score(record: &Match) -> Option<MatchScore> {
    match (record.score_a, record.score_b) {
        (Some(a), Some(b)) => MatchScore::new(a, b).ok(),
        _ => None,
    }
}

fn load_rosters(
    conn: &Connection,
    participants: &[Participant],
) -> Result<(Vec<Player>, Vec<Player>)> {
    let mut team_a = Vec::new();
    let mut team_b = Vec::new();

    for participant in participants {
        let player = players::find_by_id(conn, participant.player_id)?
            .ok_or(LadderError::UnknownPlayer(participant.player_id))?;
        match participant.team {
            Team::A => team_a.push(player),
            Team::B => team_b.push(player),
        }
    }

    Ok((team_a, team_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use r2d2_sqlite::SqliteConnectionManager;

    use crate::database::{self, DbConn, DbPool};

    // A single-connection pool keeps the in-memory database alive across
    // checkouts within one test.
    fn test_conn() -> (DbPool, DbConn) {
        let manager = SqliteConnectionManager::memory();
        let pool = r2d2::Pool::builder().max_size(1).build(manager).unwrap();
        let conn = pool.get().unwrap();
        database::setup::reset_database(&conn).unwrap();
        (pool, conn)
    }

    fn service() -> SettlementService {
        SettlementService::new(&AppConfig::new())
    }

    fn seed_player(conn: &Connection, name: &str, elo: i64) -> Player {
        database::players::insert_player(conn, name, elo, 0, 0).unwrap()
    }

    fn seed_match(conn: &Connection, team_a: &[&Player], team_b: &[&Player]) -> Match {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(22, 0, 0)
            .unwrap();
        let record = matches::insert_match(conn, date, "Municipal pitch", 40.0).unwrap();
        for p in team_a {
            matches::insert_participant(conn, record.id, p.id, Team::A, false).unwrap();
        }
        for p in team_b {
            matches::insert_participant(conn, record.id, p.id, Team::B, false).unwrap();
        }
        record
    }

    fn elo_of(conn: &Connection, id: i64) -> Player {
        database::players::find_by_id(conn, id).unwrap().unwrap()
    }

    #[test]
    fn apply_result_updates_players_and_snapshots() {
        let (_pool, mut conn) = test_conn();
        let (a, b, c, d) = (
            seed_player(&conn, "A", 1500),
            seed_player(&conn, "B", 1400),
            seed_player(&conn, "C", 1600),
            seed_player(&conn, "D", 1300),
        );
        let record = seed_match(&conn, &[&a, &b], &[&c, &d]);

        service()
            .apply_result(&mut conn, record.id, MatchScore::new(3, 2).unwrap())
            .unwrap();

        assert_eq!(elo_of(&conn, a.id).elo, 1525);
        assert_eq!(elo_of(&conn, b.id).elo, 1425);
        assert_eq!(elo_of(&conn, c.id).elo, 1575);
        assert_eq!(elo_of(&conn, d.id).elo, 1275);
        assert_eq!(elo_of(&conn, a.id).wins, 1);
        assert_eq!(elo_of(&conn, c.id).wins, 0);
        assert_eq!(elo_of(&conn, c.id).matches_played, 1);

        let participants = matches::list_participants(&conn, record.id).unwrap();
        for p in &participants {
            assert!(p.elo_before.is_some() && p.elo_after.is_some());
        }
        let stored = matches::find_by_id(&conn, record.id).unwrap().unwrap();
        assert_eq!((stored.score_a, stored.score_b), (Some(3), Some(2)));
    }

    #[test]
    fn identical_resubmission_is_a_no_op() {
        let (_pool, mut conn) = test_conn();
        let a = seed_player(&conn, "A", 1500);
        let b = seed_player(&conn, "B", 1500);
        let record = seed_match(&conn, &[&a], &[&b]);
        let score = MatchScore::new(2, 1).unwrap();

        let service = service();
        service.apply_result(&mut conn, record.id, score).unwrap();
        let after_first = elo_of(&conn, a.id);

        service.apply_result(&mut conn, record.id, score).unwrap();
        let after_second = elo_of(&conn, a.id);

        assert_eq!(after_first.elo, after_second.elo);
        assert_eq!(after_first.matches_played, 1);
        assert_eq!(after_second.matches_played, 1);
    }

    #[test]
    fn changed_result_reverts_before_reapplying() {
        let (_pool, mut conn) = test_conn();
        let a = seed_player(&conn, "A", 1500);
        let b = seed_player(&conn, "B", 1500);
        let record = seed_match(&conn, &[&a], &[&b]);

        let service = service();
        service
            .apply_result(&mut conn, record.id, MatchScore::new(1, 0).unwrap())
            .unwrap();
        service
            .apply_result(&mut conn, record.id, MatchScore::new(0, 1).unwrap())
            .unwrap();

        // One counted match each, and the flipped result from the baseline.
        let player_a = elo_of(&conn, a.id);
        let player_b = elo_of(&conn, b.id);
        assert_eq!(player_a.matches_played, 1);
        assert_eq!(player_b.matches_played, 1);
        assert_eq!(player_a.elo, 1475);
        assert_eq!(player_b.elo, 1525);
        assert_eq!(player_a.wins, 0);
        assert_eq!(player_b.wins, 1);
    }

    #[test]
    fn revert_restores_exact_pre_match_state() {
        let (_pool, mut conn) = test_conn();
        let a = seed_player(&conn, "A", 1500);
        let b = seed_player(&conn, "B", 1400);
        let record = seed_match(&conn, &[&a], &[&b]);

        let service = service();
        service
            .apply_result(&mut conn, record.id, MatchScore::new(4, 1).unwrap())
            .unwrap();
        service.revert(&mut conn, record.id).unwrap();

        let player_a = elo_of(&conn, a.id);
        let player_b = elo_of(&conn, b.id);
        assert_eq!((player_a.elo, player_a.matches_played, player_a.wins), (1500, 0, 0));
        assert_eq!((player_b.elo, player_b.matches_played, player_b.wins), (1400, 0, 0));

        let stored = matches::find_by_id(&conn, record.id).unwrap().unwrap();
        assert!(!stored.has_result());
        for p in matches::list_participants(&conn, record.id).unwrap() {
            assert!(p.elo_before.is_none() && p.elo_after.is_none());
        }
    }

    #[test]
    fn revert_without_settlement_is_an_error() {
        let (_pool, mut conn) = test_conn();
        let a = seed_player(&conn, "A", 1500);
        let b = seed_player(&conn, "B", 1500);
        let record = seed_match(&conn, &[&a], &[&b]);

        let err = service().revert(&mut conn, record.id).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LadderError>(),
            Some(&LadderError::NotSettled(record.id))
        );
    }

    #[test]
    fn double_revert_is_an_error_not_a_silent_no_op() {
        let (_pool, mut conn) = test_conn();
        let a = seed_player(&conn, "A", 1500);
        let b = seed_player(&conn, "B", 1500);
        let record = seed_match(&conn, &[&a], &[&b]);

        let service = service();
        service
            .apply_result(&mut conn, record.id, MatchScore::new(1, 0).unwrap())
            .unwrap();
        service.revert(&mut conn, record.id).unwrap();

        assert!(service.revert(&mut conn, record.id).is_err());
        assert_eq!(elo_of(&conn, a.id).matches_played, 0);
    }

    #[test]
    fn reapplication_after_revert_matches_a_single_application() {
        let (_pool, mut conn) = test_conn();
        let a = seed_player(&conn, "A", 1480);
        let b = seed_player(&conn, "B", 1520);
        let record = seed_match(&conn, &[&a], &[&b]);
        let score = MatchScore::new(2, 0).unwrap();

        let service = service();
        service.apply_result(&mut conn, record.id, score).unwrap();
        let single_a = elo_of(&conn, a.id).elo;
        let single_b = elo_of(&conn, b.id).elo;

        service.revert(&mut conn, record.id).unwrap();
        service.apply_result(&mut conn, record.id, score).unwrap();

        assert_eq!(elo_of(&conn, a.id).elo, single_a);
        assert_eq!(elo_of(&conn, b.id).elo, single_b);
        assert_eq!(elo_of(&conn, a.id).matches_played, 1);
    }

    #[test]
    fn delete_settled_match_restores_players_and_removes_rows() {
        let (_pool, mut conn) = test_conn();
        let (a, b, c, d) = (
            seed_player(&conn, "A", 1500),
            seed_player(&conn, "B", 1400),
            seed_player(&conn, "C", 1600),
            seed_player(&conn, "D", 1300),
        );
        let record = seed_match(&conn, &[&a, &b], &[&c, &d]);

        let service = service();
        service
            .apply_result(&mut conn, record.id, MatchScore::new(3, 2).unwrap())
            .unwrap();
        service.delete_match(&mut conn, record.id).unwrap();

        for (id, elo) in [(a.id, 1500), (b.id, 1400), (c.id, 1600), (d.id, 1300)] {
            let player = elo_of(&conn, id);
            assert_eq!(player.elo, elo);
            assert_eq!(player.matches_played, 0);
            assert_eq!(player.wins, 0);
        }
        assert!(matches::find_by_id(&conn, record.id).unwrap().is_none());
        assert!(matches::list_participants(&conn, record.id).unwrap().is_empty());
    }

    #[test]
    fn revert_restores_the_snapshot_even_after_other_matches_moved_players() {
        let (_pool, mut conn) = test_conn();
        let a = seed_player(&conn, "A", 1500);
        let b = seed_player(&conn, "B", 1500);
        let c = seed_player(&conn, "C", 1500);

        let service = service();
        let first = seed_match(&conn, &[&a], &[&b]);
        service
            .apply_result(&mut conn, first.id, MatchScore::new(1, 0).unwrap())
            .unwrap();

        let second = seed_match(&conn, &[&a], &[&c]);
        service
            .apply_result(&mut conn, second.id, MatchScore::new(1, 0).unwrap())
            .unwrap();

        // Deleting the first match out of order snaps A back to the value
        // recorded before the first match, discarding the drift from the
        // second. That is the documented snapshot-restore policy.
        service.delete_match(&mut conn, first.id).unwrap();
        assert_eq!(elo_of(&conn, a.id).elo, 1500);
        assert_eq!(elo_of(&conn, a.id).matches_played, 1);
        assert_eq!(elo_of(&conn, a.id).wins, 1);
    }

    #[test]
    fn draw_settlement_increments_no_wins_and_reverts_cleanly() {
        let (_pool, mut conn) = test_conn();
        let a = seed_player(&conn, "A", 1700);
        let b = seed_player(&conn, "B", 1300);
        let record = seed_match(&conn, &[&a], &[&b]);

        let service = service();
        service
            .apply_result(&mut conn, record.id, MatchScore::new(2, 2).unwrap())
            .unwrap();
        assert_eq!(elo_of(&conn, a.id).wins, 0);
        assert_eq!(elo_of(&conn, b.id).wins, 0);
        assert!(elo_of(&conn, a.id).elo < 1700);

        service.revert(&mut conn, record.id).unwrap();
        assert_eq!(elo_of(&conn, a.id).elo, 1700);
        assert_eq!(elo_of(&conn, b.id).elo, 1300);
    }

    #[test]
    fn edit_roster_preserves_paid_only_for_same_team_players() {
        let (_pool, mut conn) = test_conn();
        let a = seed_player(&conn, "A", 1500);
        let b = seed_player(&conn, "B", 1500);
        let c = seed_player(&conn, "C", 1500);
        let record = seed_match(&conn, &[&a], &[&b]);

        let participants = matches::list_participants(&conn, record.id).unwrap();
        matches::set_paid(&conn, participants[0].id, true).unwrap();
        matches::set_paid(&conn, participants[1].id, true).unwrap();

        // A stays on team A, B switches from B to A, C is new.
        service()
            .edit_roster(&mut conn, record.id, &[a.id, b.id], &[c.id])
            .unwrap();

        let updated = matches::list_participants(&conn, record.id).unwrap();
        let by_player: HashMap<i64, &Participant> =
            updated.iter().map(|p| (p.player_id, p)).collect();
        assert!(by_player[&a.id].paid);
        assert!(!by_player[&b.id].paid);
        assert!(!by_player[&c.id].paid);
        assert_eq!(by_player[&b.id].team, Team::A);
        assert_eq!(by_player[&c.id].team, Team::B);
    }

    #[test]
    fn roster_edit_on_settled_match_reverts_and_can_be_resettled() {
        let (_pool, mut conn) = test_conn();
        let a = seed_player(&conn, "A", 1500);
        let b = seed_player(&conn, "B", 1500);
        let c = seed_player(&conn, "C", 1500);
        let record = seed_match(&conn, &[&a], &[&b]);
        let score = MatchScore::new(1, 0).unwrap();

        let service = service();
        service.apply_result(&mut conn, record.id, score).unwrap();

        // Adding C to team B unwinds the settlement while the snapshots
        // still reflect the old roster.
        service
            .edit_roster(&mut conn, record.id, &[a.id], &[b.id, c.id])
            .unwrap();

        let player_a = elo_of(&conn, a.id);
        assert_eq!((player_a.elo, player_a.matches_played, player_a.wins), (1500, 0, 0));
        assert_eq!(elo_of(&conn, b.id).elo, 1500);
        assert!(!matches::find_by_id(&conn, record.id).unwrap().unwrap().has_result());
        for p in matches::list_participants(&conn, record.id).unwrap() {
            assert!(p.elo_before.is_none() && p.elo_after.is_none());
        }

        // Re-applying the same score settles the new roster in full.
        service.apply_result(&mut conn, record.id, score).unwrap();
        assert_eq!(elo_of(&conn, a.id).elo, 1525);
        assert_eq!(elo_of(&conn, b.id).elo, 1475);
        assert_eq!(elo_of(&conn, c.id).elo, 1475);
        assert_eq!(elo_of(&conn, c.id).matches_played, 1);
        for p in matches::list_participants(&conn, record.id).unwrap() {
            assert!(p.elo_before.is_some() && p.elo_after.is_some());
        }

        // And deletion reverts cleanly afterwards.
        service.delete_match(&mut conn, record.id).unwrap();
        for id in [a.id, b.id, c.id] {
            let player = elo_of(&conn, id);
            assert_eq!((player.elo, player.matches_played, player.wins), (1500, 0, 0));
        }
        assert!(matches::find_by_id(&conn, record.id).unwrap().is_none());
    }

    #[test]
    fn unchanged_roster_edit_leaves_the_settlement_alone() {
        let (_pool, mut conn) = test_conn();
        let a = seed_player(&conn, "A", 1500);
        let b = seed_player(&conn, "B", 1500);
        let record = seed_match(&conn, &[&a], &[&b]);

        let service = service();
        service
            .apply_result(&mut conn, record.id, MatchScore::new(1, 0).unwrap())
            .unwrap();
        service
            .edit_roster(&mut conn, record.id, &[a.id], &[b.id])
            .unwrap();

        assert_eq!(elo_of(&conn, a.id).elo, 1525);
        assert!(matches::find_by_id(&conn, record.id).unwrap().unwrap().has_result());
        for p in matches::list_participants(&conn, record.id).unwrap() {
            assert!(p.elo_before.is_some() && p.elo_after.is_some());
        }
    }

    #[test]
    fn edit_roster_rejects_unknown_players() {
        let (_pool, mut conn) = test_conn();
        let a = seed_player(&conn, "A", 1500);
        let b = seed_player(&conn, "B", 1500);
        let record = seed_match(&conn, &[&a], &[&b]);

        let err = service()
            .edit_roster(&mut conn, record.id, &[a.id], &[9999])
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<LadderError>(),
            Some(&LadderError::UnknownPlayer(9999))
        );

        // Transaction rolled back: the old roster is still there.
        let participants = matches::list_participants(&conn, record.id).unwrap();
        assert_eq!(participants.len(), 2);
    }

    #[test]
    fn settling_an_empty_side_is_rejected_without_writes() {
        let (_pool, mut conn) = test_conn();
        let a = seed_player(&conn, "A", 1500);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(22, 0, 0)
            .unwrap();
        let record = matches::insert_match(&conn, date, "Municipal pitch", 40.0).unwrap();
        matches::insert_participant(&conn, record.id, a.id, Team::A, false).unwrap();

        let err = service()
            .apply_result(&mut conn, record.id, MatchScore::new(1, 0).unwrap())
            .unwrap_err();
        assert_eq!(err.downcast_ref::<LadderError>(), Some(&LadderError::EmptyTeam));

        let player = elo_of(&conn, a.id);
        assert_eq!((player.elo, player.matches_played), (1500, 0));
        assert!(!matches::find_by_id(&conn, record.id).unwrap().unwrap().has_result());
    }
}
