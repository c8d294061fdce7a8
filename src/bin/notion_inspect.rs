use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use steam_notion_sync::config;
use steam_notion_sync::notion::{NotionClient, NotionService};

#[derive(Parser, Debug)]
#[command(about = "Print the data sources and property schema of a Notion database")]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Database ID to inspect (defaults to notion.database_id)
    #[arg(long)]
    db_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let cfg = config::load(Some(args.config.as_path()))?;
    let client = NotionClient::new(cfg.notion.token.clone(), cfg.notion.version.clone());
    let db_id = args.db_id.unwrap_or_else(|| cfg.notion.database_id.clone());

    let db = client.retrieve_database(&db_id).await?;
    println!("Database ID: {}", db.id);
    for (name, prop) in &db.properties {
        println!("  {} -> {{ id: {}, type: {} }}", name, prop.id, prop.typ);
    }
    for ds in &db.data_sources {
        println!(
            "Data source: {} ({})",
            ds.id,
            ds.name.as_deref().unwrap_or("unnamed")
        );
        let schema = client.retrieve_data_source(&ds.id).await?;
        for (name, prop) in schema.properties {
            println!("  {} -> {{ id: {}, type: {} }}", name, prop.id, prop.typ);
        }
    }
    Ok(())
}
