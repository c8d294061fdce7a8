use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::model::GameRecord;

pub const STORE_URL_PREFIX: &str = "https://store.steampowered.com/app/";

/// Display names of the Notion properties the syncer writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PropertyNames {
    pub title: String,
    pub app_id: String,
    pub playtime: String,
    pub last_played: String,
    pub store_link: String,
    pub synced_at: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            title: "Name".into(),
            app_id: "App ID".into(),
            playtime: "Playtime".into(),
            last_played: "Last Played".into(),
            store_link: "Steam Link".into(),
            synced_at: "Synced At".into(),
        }
    }
}

/// Minutes to hours, rounded to one decimal.
pub fn playtime_hours(minutes: Option<i64>) -> f64 {
    let minutes = minutes.unwrap_or(0) as f64;
    (minutes / 60.0 * 10.0).round() / 10.0
}

pub fn build_properties(
    fields: &PropertyNames,
    record: &GameRecord,
    synced_at: DateTime<Utc>,
) -> Value {
    let title = record
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("App {}", record.app_id));

    let last_played = match record.last_played {
        Some(at) => json!({ "date": { "start": at.to_rfc3339() } }),
        None => json!({ "date": null }),
    };

    let mut properties = Map::new();
    properties.insert(
        fields.title.clone(),
        json!({ "title": [ { "text": { "content": title } } ] }),
    );
    properties.insert(fields.app_id.clone(), json!({ "number": record.app_id }));
    properties.insert(
        fields.playtime.clone(),
        json!({ "number": playtime_hours(record.playtime_minutes) }),
    );
    properties.insert(fields.last_played.clone(), last_played);
    properties.insert(
        fields.store_link.clone(),
        json!({ "url": format!("{}{}", STORE_URL_PREFIX, record.app_id) }),
    );
    properties.insert(
        fields.synced_at.clone(),
        json!({ "date": { "start": synced_at.to_rfc3339() } }),
    );
    Value::Object(properties)
}

pub fn build_cover(record: &GameRecord) -> Option<Value> {
    record
        .header_image
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .map(|url| json!({ "type": "external", "external": { "url": url } }))
}
