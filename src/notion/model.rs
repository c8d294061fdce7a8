use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Collection pages are written into: a database, optionally addressed
/// through one of its data sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionTarget {
    pub database_id: String,
    pub data_source_id: Option<String>,
}

impl CollectionTarget {
    pub fn new(database_id: impl Into<String>, data_source_id: Option<String>) -> Self {
        Self {
            database_id: database_id.into(),
            data_source_id: data_source_id.filter(|s| !s.trim().is_empty()),
        }
    }

    /// Whether a page with `parent` lives inside this collection, by database
    /// id or by data source id.
    pub fn contains(&self, parent: &PageParent) -> bool {
        let same = |a: Option<&str>, b: &str| a.map(|a| same_id(a, b)).unwrap_or(false);
        if same(parent.database_id.as_deref(), &self.database_id) {
            return true;
        }
        match &self.data_source_id {
            Some(ds) => same(parent.data_source_id.as_deref(), ds),
            None => false,
        }
    }
}

/// Compare two Notion ids regardless of dashes and case.
pub fn same_id(a: &str, b: &str) -> bool {
    normalize_id(a) == normalize_id(b)
}

pub fn normalize_id(id: &str) -> String {
    let id = id.trim();
    match Uuid::parse_str(id) {
        Ok(uuid) => uuid.hyphenated().to_string(),
        Err(_) => id.to_ascii_lowercase(),
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PageParent {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub database_id: Option<String>,
    #[serde(default)]
    pub data_source_id: Option<String>,
    #[serde(default)]
    pub page_id: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub id: String,
    #[serde(default)]
    pub parent: PageParent,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub in_trash: bool,
}

impl PageSummary {
    pub fn is_trashed(&self) -> bool {
        self.archived || self.in_trash
    }
}

#[derive(Deserialize, Debug)]
pub struct QueryResp {
    #[serde(default)]
    pub results: Vec<PageSummary>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DatabaseProperty {
    pub id: String,
    #[serde(rename = "type")]
    pub typ: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DataSourceRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Database (or data source) object. Since API version 2025-09-03 the
/// property schema lives on the data source and the database only lists
/// `data_sources`.
#[derive(Deserialize, Debug, Clone)]
pub struct DatabaseSummary {
    pub id: String,
    #[serde(default)]
    pub title: Vec<Value>,
    #[serde(default)]
    pub properties: HashMap<String, DatabaseProperty>,
    #[serde(default)]
    pub data_sources: Vec<DataSourceRef>,
}

impl DatabaseSummary {
    pub fn first_data_source(&self) -> Option<&str> {
        self.data_sources.first().map(|ds| ds.id.as_str())
    }
}

#[derive(Deserialize)]
pub(crate) struct CreatedObject {
    pub id: String,
}

/// Page body blocks emitted by the content transformer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Callout { emoji: String, text: String },
    Heading { text: String },
    Paragraph { text: String },
    Image { url: String },
}

impl Block {
    pub fn to_json(&self) -> Value {
        match self {
            Block::Callout { emoji, text } => json!({
                "object": "block",
                "type": "callout",
                "callout": {
                    "icon": { "type": "emoji", "emoji": emoji },
                    "rich_text": rich_text(text),
                }
            }),
            Block::Heading { text } => json!({
                "object": "block",
                "type": "heading_2",
                "heading_2": { "rich_text": rich_text(text) }
            }),
            Block::Paragraph { text } => json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": rich_text(text) }
            }),
            Block::Image { url } => json!({
                "object": "block",
                "type": "image",
                "image": { "type": "external", "external": { "url": url } }
            }),
        }
    }
}

fn rich_text(content: &str) -> Value {
    json!([{ "type": "text", "text": { "content": content } }])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_with_or_without_dashes() {
        assert!(same_id(
            "1a2b3c4d5e6f47889900aabbccddeeff",
            "1A2B3C4D-5E6F-4788-9900-AABBCCDDEEFF"
        ));
        assert!(!same_id("db-one", "db-two"));
        assert!(same_id(" db-one ", "DB-ONE"));
    }

    #[test]
    fn target_matches_database_or_data_source_parent() {
        let target = CollectionTarget::new("db-1", Some("ds-1".into()));
        let by_db = PageParent {
            kind: Some("database_id".into()),
            database_id: Some("db-1".into()),
            ..Default::default()
        };
        let by_ds = PageParent {
            kind: Some("data_source_id".into()),
            data_source_id: Some("ds-1".into()),
            ..Default::default()
        };
        let elsewhere = PageParent {
            kind: Some("database_id".into()),
            database_id: Some("db-2".into()),
            data_source_id: Some("ds-2".into()),
            ..Default::default()
        };
        let under_page = PageParent {
            kind: Some("page_id".into()),
            page_id: Some("db-1".into()),
            ..Default::default()
        };
        assert!(target.contains(&by_db));
        assert!(target.contains(&by_ds));
        assert!(!target.contains(&elsewhere));
        assert!(!target.contains(&under_page));

        let db_only = CollectionTarget::new("db-1", Some(" ".into()));
        assert_eq!(db_only.data_source_id, None);
        assert!(!db_only.contains(&by_ds));
    }

    #[test]
    fn page_summary_parses_data_source_parent() {
        let page: PageSummary = serde_json::from_value(json!({
            "object": "page",
            "id": "p1",
            "parent": { "type": "data_source_id", "data_source_id": "ds", "database_id": "db" },
            "in_trash": true
        }))
        .unwrap();
        assert_eq!(page.parent.database_id.as_deref(), Some("db"));
        assert!(page.is_trashed());
    }

    #[test]
    fn blocks_render_notion_shapes() {
        let image = Block::Image {
            url: "https://cdn/a.png".into(),
        }
        .to_json();
        assert_eq!(image["image"]["external"]["url"], "https://cdn/a.png");

        let heading = Block::Heading { text: "Hi".into() }.to_json();
        assert_eq!(heading["type"], "heading_2");
        assert_eq!(heading["heading_2"]["rich_text"][0]["text"]["content"], "Hi");
    }
}
