use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use steam_notion_sync::config;
use steam_notion_sync::db;
use steam_notion_sync::notion::NotionClient;
use steam_notion_sync::sync::{NotionSyncer, SyncSettings};

#[derive(Debug, Parser)]
#[command(author, version, about = "Sync a user's Steam library into a Notion database")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Library owner whose games are synced
    #[arg(long)]
    user: String,

    /// Only sync games changed after this RFC 3339 timestamp
    #[arg(long)]
    since: Option<DateTime<Utc>>,

    /// Keep running, syncing changes since the previous run every poll interval
    #[arg(long)]
    watch: bool,
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

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    let notion = NotionClient::new(cfg.notion.token.clone(), cfg.notion.version.clone());
    let syncer = NotionSyncer::new(&pool, &notion, SyncSettings::from_config(&cfg));

    let target = syncer.target().await?;
    let ds_unpinned =
        cfg.notion.data_source_id.trim().is_empty() && target.data_source_id.is_some();
    if cfg.notion.database_id.trim() != target.database_id || ds_unpinned {
        match config::pin_collection(
            &args.config,
            &target.database_id,
            target.data_source_id.as_deref(),
        ) {
            Ok(()) => info!(path = %args.config.display(), "saved Notion collection ids to config"),
            Err(err) => warn!(
                error = %err,
                database_id = %target.database_id,
                data_source_id = ?target.data_source_id,
                "failed to save Notion collection ids; add them to the config manually"
            ),
        }
    }

    if !args.watch {
        let report = syncer
            .sync_batch_with_target(&target, &args.user, args.since)
            .await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let poll_sleep = Duration::from_millis(cfg.app.poll_interval_ms);
    let mut watermark = args.since;
    info!(user = %args.user, "watching library for changes");
    loop {
        let started = Utc::now();
        match syncer
            .sync_batch_with_target(&target, &args.user, watermark)
            .await
        {
            Ok(report) => {
                // Failed records must be picked up again, so the watermark only
                // advances on a clean run.
                if report.failed == 0 {
                    watermark = Some(started);
                }
                println!("{}", serde_json::to_string(&report)?);
            }
            Err(err) => error!(error = %err, "sync run failed"),
        }
        tokio::time::sleep(poll_sleep).await;
    }
}
