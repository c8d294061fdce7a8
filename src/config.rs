//! Configuration loader and validator for the Steam→Notion syncer.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::sync::properties::PropertyNames;

pub const DEFAULT_NOTION_VERSION: &str = "2025-09-03";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub notion: Notion,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Minimum pause after every Notion write (and backfill lookup).
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,
    #[serde(default = "default_backfill_limit")]
    pub backfill_limit: i64,
}

/// Notion API settings and target collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notion {
    pub token: String,
    #[serde(default = "default_notion_version")]
    pub version: String,
    #[serde(default)]
    pub database_id: String,
    #[serde(default)]
    pub data_source_id: String,
    /// Page under which a database is created when none is configured.
    #[serde(default)]
    pub root_page_id: String,
    #[serde(default = "default_true")]
    pub auto_provision: bool,
    #[serde(default)]
    pub fields: PropertyNames,
}

fn default_poll_interval_ms() -> u64 {
    60_000
}

fn default_request_interval_ms() -> u64 {
    400
}

fn default_backfill_limit() -> i64 {
    50
}

fn default_notion_version() -> String {
    DEFAULT_NOTION_VERSION.to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// SQLite URL for the local store; `DATABASE_URL` wins when set.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/games.db", self.app.data_dir))
    }

    /// Overlay `NOTION_*` variables on top of the file values.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = non_empty("NOTION_API_KEY") {
            self.notion.token = v;
        }
        if let Some(v) = non_empty("NOTION_DATABASE_ID") {
            self.notion.database_id = v;
        }
        if let Some(v) = non_empty("NOTION_DATA_SOURCE_ID") {
            self.notion.data_source_id = v;
        }
        if let Some(v) = non_empty("NOTION_ROOT_PAGE_ID") {
            self.notion.root_page_id = v;
        }
        if let Some(v) = non_empty("NOTION_AUTO_PROVISION") {
            self.notion.auto_provision = !v.trim().eq_ignore_ascii_case("false");
        }
    }
}

/// Load configuration from a YAML file, apply environment overrides and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env_overrides(|key| std::env::var(key).ok());
    validate(&cfg)?;
    Ok(cfg)
}

/// Write resolved collection ids into the `notion` section of the YAML file
/// at `path` so later runs reuse the same collection. Other keys are kept;
/// comments are not.
pub fn pin_collection(
    path: &Path,
    database_id: &str,
    data_source_id: Option<&str>,
) -> Result<(), ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut doc: serde_yaml::Value = serde_yaml::from_str(&content)?;
    let notion = doc
        .get_mut("notion")
        .and_then(serde_yaml::Value::as_mapping_mut)
        .ok_or(ConfigError::Invalid("config has no notion section"))?;
    notion.insert("database_id".into(), database_id.into());
    notion.insert(
        "data_source_id".into(),
        data_source_id.unwrap_or_default().into(),
    );
    fs::write(path, serde_yaml::to_string(&doc)?)?;
    Ok(())
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_ms must be > 0"));
    }
    if cfg.app.backfill_limit <= 0 {
        return Err(ConfigError::Invalid("app.backfill_limit must be > 0"));
    }

    if cfg.notion.token.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.token must be non-empty"));
    }
    if cfg.notion.version.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.version must be non-empty"));
    }

    let f = &cfg.notion.fields;
    if f.title.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.fields.title must be non-empty"));
    }
    if f.app_id.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.fields.app_id must be non-empty"));
    }
    if f.playtime.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.fields.playtime must be non-empty"));
    }
    if f.last_played.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.fields.last_played must be non-empty"));
    }
    if f.store_link.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.fields.store_link must be non-empty"));
    }
    if f.synced_at.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.fields.synced_at must be non-empty"));
    }

    Ok(())
}

/// Returns an example YAML configuration.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  poll_interval_ms: 60000
  request_interval_ms: 400
  backfill_limit: 50

notion:
  token: "YOUR_NOTION_INTEGRATION_TOKEN"
  version: "2025-09-03"
  database_id: "NOTION_DATABASE_ID"
  data_source_id: ""
  root_page_id: ""
  auto_provision: true
  fields:
    title: "Name"
    app_id: "App ID"
    playtime: "Playtime"
    last_played: "Last Played"
    store_link: "Steam Link"
    synced_at: "Synced At"
"#
}
