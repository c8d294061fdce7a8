use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

use steam_notion_sync::config;
use steam_notion_sync::db::{self, GameDetail, UserGame};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Import a JSON export of a Steam library into the local game tables"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Library owner the games belong to
    #[arg(long)]
    user: String,

    /// JSON file with `games` and optional `details` arrays
    #[arg(long)]
    input: PathBuf,
}

#[derive(Debug, Deserialize)]
struct LibraryExport {
    games: Vec<UserGame>,
    #[serde(default)]
    details: Vec<GameDetail>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(args.config.as_path()))?;
    cfg.ensure_dirs()?;

    let raw = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let export: LibraryExport =
        serde_json::from_str(&raw).context("invalid library export JSON")?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    let now = Utc::now();
    for detail in &export.details {
        db::upsert_game_detail(&pool, detail, now).await?;
    }
    for game in &export.games {
        db::upsert_user_game(&pool, &args.user, game, now).await?;
    }

    info!(
        user = %args.user,
        games = export.games.len(),
        details = export.details.len(),
        "library imported"
    );
    Ok(())
}
