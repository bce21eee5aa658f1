pub mod api;
pub mod cli;
pub mod config;
pub mod database;
pub mod errors;
pub mod rating;
pub mod services;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

use crate::cli::Command;
use crate::config::settings::AppConfig;
use crate::services::seed::SeedService;
use crate::services::server::ServerService;

pub fn interpret() -> Command {
    let cli = Cli::parse();
    cli.command
}

pub fn handle_serve(port: u16) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let config = AppConfig::new();
        let service = ServerService::new(port, config);
        service.run().await
    })
}

pub fn handle_init() -> Result<()> {
    let db_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "sunday_league_ladder.db".to_string());
    let pool = database::create_pool(&db_path)?;
    let conn = database::get_connection(&pool)?;
    database::setup::reset_database(&conn)
}

pub fn handle_seed(file: &Path) -> Result<()> {
    let config = AppConfig::new();
    let service = SeedService::new(config);
    service.run(file)
}
