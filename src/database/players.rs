use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use super::models::{Player, SortColumn, SortOrder};

const PLAYER_COLUMNS: &str = "id, name, elo, matches_played, wins, created_at";

pub fn insert_player(
    conn: &Connection,
    name: &str,
    elo: i64,
    matches_played: i64,
    wins: i64,
) -> Result<Player> {
    let sql = format!(
        "INSERT INTO players (name, elo, matches_played, wins) VALUES (?1, ?2, ?3, ?4) RETURNING {PLAYER_COLUMNS}"
    );

    conn.query_row(&sql, params![name, elo, matches_played, wins], parse_player_row)
        .context("Failed to insert new player")
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Player>> {
    let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1");

    conn.query_row(&sql, params![id], parse_player_row)
        .optional()
        .context("Failed to query player by id")
}

pub fn list_all(conn: &Connection, sort_by: &SortColumn, order: &SortOrder) -> Result<Vec<Player>> {
    let column = match sort_by {
        SortColumn::Name => "name",
        SortColumn::Elo => "elo",
        SortColumn::MatchesPlayed => "matches_played",
    };
    let direction = match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    let sql = format!("SELECT {PLAYER_COLUMNS} FROM players ORDER BY {column} {direction}");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], parse_player_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Loads the given players in one query. The result order follows the table,
/// not `ids`; callers match rows back up by id.
pub fn find_by_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<Player>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = (1..=ids.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id IN ({placeholders})");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(ids.iter()), parse_player_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn update_profile(conn: &Connection, id: i64, name: &str, elo: i64) -> Result<Player> {
    let sql = format!(
        "UPDATE players SET name = ?1, elo = ?2 WHERE id = ?3 RETURNING {PLAYER_COLUMNS}"
    );

    conn.query_row(&sql, params![name, elo, id], parse_player_row)
        .context("Failed to update player")
}

/// Writes back the rating and counters produced by a settlement or revert.
pub fn update_stats(conn: &Connection, player: &Player) -> Result<()> {
    let sql = "UPDATE players SET elo = ?1, matches_played = ?2, wins = ?3 WHERE id = ?4";

    let updated = conn
        .execute(sql, params![player.elo, player.matches_played, player.wins, player.id])
        .context("Failed to update player stats")?;
    anyhow::ensure!(updated == 1, "Player {} missing during stats update", player.id);

    Ok(())
}

pub fn delete_player(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn
        .execute("DELETE FROM players WHERE id = ?1", params![id])
        .context("Failed to delete player")?;

    Ok(deleted == 1)
}

fn parse_player_row(row: &rusqlite::Row) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        elo: row.get(2)?,
        matches_played: row.get(3)?,
        wins: row.get(4)?,
        created_at: row.get(5)?,
    })
}
