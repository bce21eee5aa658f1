use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use serde::Deserialize;

use crate::config::settings::AppConfig;
use crate::database::{self, matches, players, setup};
use crate::rating::types::{MatchScore, Team};

use super::settlement::SettlementService;

/// Imports a JSON dump of players and historical matches, settling every
/// match chronologically so the ladder state derives from the results.
pub struct SeedService {
    config: AppConfig,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    players: Vec<SeedPlayer>,
    matches: Vec<SeedMatch>,
}

#[derive(Debug, Deserialize)]
struct SeedPlayer {
    name: String,
    rating: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SeedMatch {
    venue: String,
    /// dd-mm-yyyy; kickoff is fixed at 22:00.
    date: String,
    team_a: Vec<String>,
    team_b: Vec<String>,
    score_a: i64,
    score_b: i64,
    #[serde(default)]
    price: Option<f64>,
}

impl SeedService {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, file: &Path) -> Result<()> {
        let db_path = std::env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "sunday_league_ladder.db".to_string());

        let raw = fs::read_to_string(file)
            .with_context(|| format!("Failed to read seed file {}", file.display()))?;
        let seed: SeedFile = serde_json::from_str(&raw).context("Failed to parse seed file")?;

        let pool = database::create_pool(&db_path)?;
        let mut conn = database::get_connection(&pool)?;

        info!("=== Seeding {} ===", db_path);
        setup::reset_database(&conn)?;

        let player_ids = self.insert_players(&conn, &seed.players)?;
        info!("  → Inserted {} players", player_ids.len());

        let mut sorted: Vec<&SeedMatch> = seed.matches.iter().collect();
        sorted.sort_by_key(|m| parse_seed_date(&m.date).ok());

        let settlement = SettlementService::new(&self.config);
        for entry in &sorted {
            self.insert_and_settle(&mut conn, &settlement, &player_ids, entry)?;
        }
        info!("  → Settled {} matches", sorted.len());

        info!("=== Seeding Complete ===");
        Ok(())
    }

    fn insert_players(
        &self,
        conn: &rusqlite::Connection,
        seed_players: &[SeedPlayer],
    ) -> Result<HashMap<String, i64>> {
        let mut ids = HashMap::new();
        for entry in seed_players {
            let rating = entry.rating.unwrap_or(self.config.rating.starter_rating);
            let player = players::insert_player(conn, &entry.name, rating, 0, 0)?;
            ids.insert(entry.name.clone(), player.id);
        }
        Ok(ids)
    }

    fn insert_and_settle(
        &self,
        conn: &mut rusqlite::Connection,
        settlement: &SettlementService,
        player_ids: &HashMap<String, i64>,
        entry: &SeedMatch,
    ) -> Result<()> {
        let date = parse_seed_date(&entry.date)?;
        let price = entry.price.unwrap_or(40.0);
        let record = matches::insert_match(conn, date, &entry.venue, price)?;

        for (team, roster) in [(Team::A, &entry.team_a), (Team::B, &entry.team_b)] {
            for name in roster {
                let player_id = player_ids
                    .get(name)
                    .with_context(|| format!("Match on {} names unknown player {name}", entry.date))?;
                matches::insert_participant(conn, record.id, *player_id, team, false)?;
            }
        }

        let score = MatchScore::new(entry.score_a, entry.score_b)?;
        settlement.apply_result(conn, record.id, score)
    }
}

fn parse_seed_date(raw: &str) -> Result<NaiveDateTime> {
    let Ok(date) = NaiveDate::parse_from_str(raw, "%d-%m-%Y") else {
        bail!("Failed to parse match date: {raw}");
    };
    date.and_hms_opt(22, 0, 0)
        .context("Failed to build match timestamp")
}
