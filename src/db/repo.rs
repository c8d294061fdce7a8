use super::model::{CandidateRow, GameDetail, MappingRow, UserGame};
use crate::model::{PageMapping, SyncCandidate};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let options = SqliteConnectOptions::from_str(&normalized)
        .with_context(|| format!("invalid database url {}", normalized))?
        .create_if_missing(true)
        // WAL with full durability: mappings must survive a crash mid-batch.
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full);
    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Expand a leading `~/` in a file-backed SQLite URL and make sure the parent
/// directory exists. In-memory and non-sqlite URLs pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(q) => format!("sqlite://{}?{}", path, q),
        None => format!("sqlite://{}", path),
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Library rows for `user_id` joined with store details and the current
/// mapping, most recently changed first. With `since`, only rows whose usage
/// or detail timestamp is strictly after the watermark are returned.
#[instrument(skip_all)]
pub async fn query_candidates(
    pool: &Pool,
    user_id: &str,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<SyncCandidate>> {
    let rows: Vec<CandidateRow> = sqlx::query_as(
        "SELECT ug.app_id, \
                COALESCE(ug.name, gd.name) AS name, \
                ug.playtime_forever, \
                ug.last_played, \
                ug.updated_at AS ug_updated_at, \
                gd.description, \
                gd.header_image, \
                gd.last_updated AS gd_updated_at, \
                nm.notion_page_id, \
                nm.synced_at \
         FROM user_games ug \
         LEFT JOIN game_details gd ON ug.app_id = gd.app_id \
         LEFT JOIN notion_mappings nm ON ug.app_id = nm.app_id \
         WHERE ug.user_id = ? \
           AND (? IS NULL \
                OR julianday(ug.updated_at) > julianday(?) \
                OR julianday(gd.last_updated) > julianday(?)) \
         ORDER BY julianday(ug.updated_at) DESC, ug.app_id ASC",
    )
    .bind(user_id)
    .bind(since)
    .bind(since)
    .bind(since)
    .fetch_all(pool)
    .await
    .context("failed to query sync candidates")?;

    Ok(rows.into_iter().map(SyncCandidate::from).collect())
}

/// App ids in the user's library with no mapping row or a cleared one.
#[instrument(skip_all)]
pub async fn query_missing_mappings(pool: &Pool, user_id: &str, limit: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT ug.app_id FROM user_games ug \
         LEFT JOIN notion_mappings nm ON ug.app_id = nm.app_id \
         WHERE ug.user_id = ? AND nm.notion_page_id IS NULL \
         ORDER BY ug.app_id ASC \
         LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to query missing mappings")?;
    Ok(ids)
}

/// Insert or replace the mapping for `app_id`. A `None` timestamp records a
/// page that still needs a refresh write.
#[instrument(skip_all)]
pub async fn upsert_mapping(
    pool: &Pool,
    app_id: i64,
    page_id: &str,
    synced_at: Option<DateTime<Utc>>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO notion_mappings (app_id, notion_page_id, synced_at) VALUES (?, ?, ?) \
         ON CONFLICT (app_id) DO UPDATE SET \
            notion_page_id = excluded.notion_page_id, \
            synced_at = excluded.synced_at, \
            updated_at = CURRENT_TIMESTAMP",
    )
    .bind(app_id)
    .bind(page_id)
    .bind(synced_at)
    .execute(pool)
    .await
    .with_context(|| format!("failed to persist notion mapping for app {}", app_id))?;
    Ok(())
}

/// Forget the page mapped to `app_id` while keeping the row.
#[instrument(skip_all)]
pub async fn clear_mapping(pool: &Pool, app_id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE notion_mappings \
         SET notion_page_id = NULL, synced_at = NULL, updated_at = CURRENT_TIMESTAMP \
         WHERE app_id = ?",
    )
    .bind(app_id)
    .execute(pool)
    .await
    .with_context(|| format!("failed to clear notion mapping for app {}", app_id))?;
    Ok(())
}

pub async fn fetch_mapping(pool: &Pool, app_id: i64) -> Result<Option<PageMapping>> {
    let row: Option<MappingRow> = sqlx::query_as(
        "SELECT app_id, notion_page_id, synced_at FROM notion_mappings WHERE app_id = ?",
    )
    .bind(app_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(PageMapping::from))
}

/// Upstream writer for `user_games`. `updated_at` only moves when a column
/// actually changed, so re-importing the same library does not dirty rows.
#[instrument(skip_all)]
pub async fn upsert_user_game(
    pool: &Pool,
    user_id: &str,
    game: &UserGame,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO user_games (user_id, app_id, name, playtime_forever, last_played, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT (user_id, app_id) DO UPDATE SET \
            name = excluded.name, \
            playtime_forever = excluded.playtime_forever, \
            last_played = excluded.last_played, \
            updated_at = excluded.updated_at \
         WHERE user_games.name IS NOT excluded.name \
            OR user_games.playtime_forever IS NOT excluded.playtime_forever \
            OR user_games.last_played IS NOT excluded.last_played",
    )
    .bind(user_id)
    .bind(game.app_id)
    .bind(&game.name)
    .bind(game.playtime_forever)
    .bind(game.last_played)
    .bind(updated_at)
    .execute(pool)
    .await
    .with_context(|| format!("failed to upsert user game {}", game.app_id))?;
    Ok(())
}

/// Upstream writer for `game_details`, with the same change-only timestamp rule.
#[instrument(skip_all)]
pub async fn upsert_game_detail(
    pool: &Pool,
    detail: &GameDetail,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO game_details (app_id, name, description, header_image, last_updated) \
         VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT (app_id) DO UPDATE SET \
            name = excluded.name, \
            description = excluded.description, \
            header_image = excluded.header_image, \
            last_updated = excluded.last_updated \
         WHERE game_details.name IS NOT excluded.name \
            OR game_details.description IS NOT excluded.description \
            OR game_details.header_image IS NOT excluded.header_image",
    )
    .bind(detail.app_id)
    .bind(&detail.name)
    .bind(&detail.description)
    .bind(&detail.header_image)
    .bind(updated_at)
    .execute(pool)
    .await
    .with_context(|| format!("failed to upsert game detail {}", detail.app_id))?;
    Ok(())
}
