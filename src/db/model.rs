//! Row models used by repositories.
//!
//! Keep these structs focused on the data returned by queries. Business logic
//! should live in higher layers.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{GameRecord, PageMapping, SyncCandidate};

/// Joined `user_games` + `game_details` + `notion_mappings` row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateRow {
    pub app_id: i64,
    pub name: Option<String>,
    pub playtime_forever: Option<i64>,
    pub last_played: Option<DateTime<Utc>>,
    pub ug_updated_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub header_image: Option<String>,
    pub gd_updated_at: Option<DateTime<Utc>>,
    pub notion_page_id: Option<String>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl From<CandidateRow> for SyncCandidate {
    fn from(row: CandidateRow) -> Self {
        SyncCandidate {
            mapping: PageMapping {
                app_id: row.app_id,
                page_id: row.notion_page_id.filter(|s| !s.trim().is_empty()),
                synced_at: row.synced_at,
            },
            record: GameRecord {
                app_id: row.app_id,
                name: row.name,
                playtime_minutes: row.playtime_forever,
                last_played: row.last_played,
                description: row.description,
                header_image: row.header_image,
                ug_updated_at: row.ug_updated_at,
                gd_updated_at: row.gd_updated_at,
            },
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MappingRow {
    pub app_id: i64,
    pub notion_page_id: Option<String>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl From<MappingRow> for PageMapping {
    fn from(row: MappingRow) -> Self {
        PageMapping {
            app_id: row.app_id,
            page_id: row.notion_page_id.filter(|s| !s.trim().is_empty()),
            synced_at: row.synced_at,
        }
    }
}

/// Per-user library entry written by the upstream importer.
#[derive(Debug, Clone, Deserialize)]
pub struct UserGame {
    pub app_id: i64,
    pub name: Option<String>,
    #[serde(default)]
    pub playtime_forever: Option<i64>,
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,
}

/// Store detail row written by the upstream importer.
#[derive(Debug, Clone, Deserialize)]
pub struct GameDetail {
    pub app_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub header_image: Option<String>,
}
