use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, params};

use super::models::{Match, Participant};
use crate::rating::types::Team;

const MATCH_COLUMNS: &str = "id, date, location, price, score_a, score_b, created_at";
const PARTICIPANT_COLUMNS: &str = "id, match_id, player_id, team, paid, elo_before, elo_after";

pub fn insert_match(
    conn: &Connection,
    date: NaiveDateTime,
    location: &str,
    price: f64,
) -> Result<Match> {
    let sql = format!(
        "INSERT INTO matches (date, location, price) VALUES (?1, ?2, ?3) RETURNING {MATCH_COLUMNS}"
    );

    conn.query_row(&sql, params![date, location, price], parse_match_row)
        .context("Failed to insert match")
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Match>> {
    let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?1");

    conn.query_row(&sql, params![id], parse_match_row)
        .optional()
        .context("Failed to query match by id")
}

pub fn list_all(conn: &Connection) -> Result<Vec<Match>> {
    let sql = format!("SELECT {MATCH_COLUMNS} FROM matches ORDER BY date DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], parse_match_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn update_details(
    conn: &Connection,
    id: i64,
    date: NaiveDateTime,
    location: &str,
    price: f64,
) -> Result<Match> {
    let sql = format!(
        "UPDATE matches SET date = ?1, location = ?2, price = ?3 WHERE id = ?4 RETURNING {MATCH_COLUMNS}"
    );

    conn.query_row(&sql, params![date, location, price, id], parse_match_row)
        .context("Failed to update match details")
}

pub fn set_result(conn: &Connection, id: i64, score_a: i64, score_b: i64) -> Result<()> {
    conn.execute(
        "UPDATE matches SET score_a = ?1, score_b = ?2 WHERE id = ?3",
        params![score_a, score_b, id],
    )
    .context("Failed to set match result")?;

    Ok(())
}

pub fn clear_result(conn: &Connection, id: i64) -> Result<()> {
    conn.execute(
        "UPDATE matches SET score_a = NULL, score_b = NULL WHERE id = ?1",
        params![id],
    )
    .context("Failed to clear match result")?;

    Ok(())
}

pub fn delete_match_row(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM matches WHERE id = ?1", params![id])
        .context("Failed to delete match")?;

    Ok(())
}

pub fn insert_participant(
    conn: &Connection,
    match_id: i64,
    player_id: i64,
    team: Team,
    paid: bool,
) -> Result<Participant> {
    let sql = format!(
        "INSERT INTO match_players (match_id, player_id, team, paid) VALUES (?1, ?2, ?3, ?4) RETURNING {PARTICIPANT_COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![match_id, player_id, team.as_str(), paid],
        parse_participant_row,
    )
    .context("Failed to insert match participant")
}

pub fn list_participants(conn: &Connection, match_id: i64) -> Result<Vec<Participant>> {
    let sql = format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM match_players WHERE match_id = ?1 ORDER BY id"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![match_id], parse_participant_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn delete_participants(conn: &Connection, match_id: i64) -> Result<()> {
    conn.execute("DELETE FROM match_players WHERE match_id = ?1", params![match_id])
        .context("Failed to delete match participants")?;

    Ok(())
}

/// Records the before/after rating pair for one participant. The two values
/// are always written together.
pub fn set_rating_snapshot(
    conn: &Connection,
    participant_id: i64,
    elo_before: i64,
    elo_after: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE match_players SET elo_before = ?1, elo_after = ?2 WHERE id = ?3",
        params![elo_before, elo_after, participant_id],
    )
    .context("Failed to record rating snapshot")?;

    Ok(())
}

pub fn clear_rating_snapshots(conn: &Connection, match_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE match_players SET elo_before = NULL, elo_after = NULL WHERE match_id = ?1",
        params![match_id],
    )
    .context("Failed to clear rating snapshots")?;

    Ok(())
}

pub fn set_paid(conn: &Connection, participant_id: i64, paid: bool) -> Result<()> {
    conn.execute(
        "UPDATE match_players SET paid = ?1 WHERE id = ?2",
        params![paid, participant_id],
    )
    .context("Failed to update payment flag")?;

    Ok(())
}

/// Applies a batch of payment flags in one transaction; either every flag
/// lands or none do.
pub fn set_paid_many(conn: &mut Connection, updates: &[(i64, bool)]) -> Result<()> {
    let tx = conn.transaction()?;

    for &(participant_id, paid) in updates {
        let updated = tx
            .execute(
                "UPDATE match_players SET paid = ?1 WHERE id = ?2",
                params![paid, participant_id],
            )
            .context("Failed to update payment flag")?;
        anyhow::ensure!(updated == 1, "Participant {participant_id} does not exist");
    }

    tx.commit()?;
    Ok(())
}

fn parse_match_row(row: &rusqlite::Row) -> rusqlite::Result<Match> {
    Ok(Match {
        id: row.get(0)?,
        date: row.get(1)?,
        location: row.get(2)?,
        price: row.get(3)?,
        score_a: row.get(4)?,
        score_b: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn parse_participant_row(row: &rusqlite::Row) -> rusqlite::Result<Participant> {
    let team_text: String = row.get(3)?;
    let team = Team::from_db(&team_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown team tag: {team_text}").into(),
        )
    })?;

    Ok(Participant {
        id: row.get(0)?,
        match_id: row.get(1)?,
        player_id: row.get(2)?,
        team,
        paid: row.get(4)?,
        elo_before: row.get(5)?,
        elo_after: row.get(6)?,
    })
}
