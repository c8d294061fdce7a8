#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use steam_notion_sync::config::{self, Config};
use steam_notion_sync::db::{self, GameDetail, UserGame};
use steam_notion_sync::notion::model::{DataSourceRef, DatabaseProperty};
use steam_notion_sync::notion::{
    Block, CollectionTarget, DatabaseSummary, NotionError, NotionService, PageParent, PageSummary,
};
use steam_notion_sync::sync::SyncSettings;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const DB: &str = "11111111-1111-4111-8111-111111111111";
pub const DS: &str = "22222222-2222-4222-8222-222222222222";
pub const OTHER_DB: &str = "33333333-3333-4333-8333-333333333333";
pub const USER: &str = "user-1";

pub async fn setup_pool() -> sqlx::SqlitePool {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
}

pub fn notion_settings() -> config::Notion {
    let cfg: Config = serde_yaml::from_str(config::example()).unwrap();
    let mut notion = cfg.notion;
    notion.database_id = DB.into();
    notion.data_source_id = DS.into();
    notion
}

pub fn settings() -> SyncSettings {
    SyncSettings {
        notion: notion_settings(),
        request_interval: Duration::ZERO,
        backfill_limit: 50,
    }
}

pub fn target() -> CollectionTarget {
    CollectionTarget::new(DB, Some(DS.to_string()))
}

/// Seed one owned game (and its store details) changed on `changed_day`.
pub async fn seed_game(pool: &sqlx::SqlitePool, app_id: i64, name: &str, changed_day: u32) {
    db::upsert_user_game(
        pool,
        USER,
        &UserGame {
            app_id,
            name: Some(name.to_string()),
            playtime_forever: Some(90),
            last_played: None,
        },
        day(changed_day),
    )
    .await
    .unwrap();
    db::upsert_game_detail(
        pool,
        &GameDetail {
            app_id,
            name: name.to_string(),
            description: Some(format!("<h1>{}</h1><p>About {}</p>", name, name)),
            header_image: Some(format!("https://cdn/{}/header.jpg", app_id)),
        },
        day(changed_day),
    )
    .await
    .unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { app_id: i64, children: usize },
    Update { page_id: String, app_id: i64 },
    Retrieve(String),
    Query(i64),
    RetrieveDatabase(String),
    RetrieveSchema(String),
    UpdateSchema(Vec<String>),
    CreateDatabase(String),
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub parent: PageParent,
    pub app_id: Option<i64>,
    pub trashed: bool,
}

struct State {
    pages: HashMap<String, FakePage>,
    calls: Vec<Call>,
    fail_writes_for: HashSet<i64>,
    fail_retrieves: bool,
    fail_queries: bool,
    database_sources: Vec<String>,
    /// Property name to type, as the collection reports it.
    schema: HashMap<String, String>,
}

impl Default for State {
    fn default() -> Self {
        let schema = [
            ("Name", "title"),
            ("App ID", "number"),
            ("Playtime", "number"),
            ("Last Played", "date"),
            ("Steam Link", "url"),
            ("Synced At", "date"),
        ];
        Self {
            pages: HashMap::new(),
            calls: Vec::new(),
            fail_writes_for: HashSet::new(),
            fail_retrieves: false,
            fail_queries: false,
            database_sources: Vec::new(),
            schema: schema
                .iter()
                .map(|(name, typ)| (name.to_string(), typ.to_string()))
                .collect(),
        }
    }
}

/// In-memory Notion that records every call.
pub struct FakeNotion {
    app_id_property: String,
    state: Mutex<State>,
}

impl Default for FakeNotion {
    fn default() -> Self {
        Self {
            app_id_property: notion_settings().fields.app_id,
            state: Mutex::new(State::default()),
        }
    }
}

impl FakeNotion {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_page(&self, page_id: &str, database_id: &str, app_id: i64) {
        self.state.lock().await.pages.insert(
            page_id.to_string(),
            FakePage {
                parent: PageParent {
                    kind: Some("database_id".into()),
                    database_id: Some(database_id.to_string()),
                    ..Default::default()
                },
                app_id: Some(app_id),
                trashed: false,
            },
        );
    }

    pub async fn trash_page(&self, page_id: &str) {
        if let Some(page) = self.state.lock().await.pages.get_mut(page_id) {
            page.trashed = true;
        }
    }

    pub async fn fail_writes_for(&self, app_id: i64) {
        self.state.lock().await.fail_writes_for.insert(app_id);
    }

    pub async fn fail_retrieves(&self) {
        self.state.lock().await.fail_retrieves = true;
    }

    pub async fn fail_queries(&self) {
        self.state.lock().await.fail_queries = true;
    }

    pub async fn set_database_sources(&self, sources: Vec<String>) {
        self.state.lock().await.database_sources = sources;
    }

    pub async fn set_schema(&self, properties: &[(&str, &str)]) {
        self.state.lock().await.schema = properties
            .iter()
            .map(|(name, typ)| (name.to_string(), typ.to_string()))
            .collect();
    }

    pub async fn schema_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().await.schema.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn count(&self, wanted: impl Fn(&Call) -> bool) -> usize {
        self.calls().await.iter().filter(|c| wanted(*c)).count()
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub async fn creates(&self) -> Vec<i64> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                Call::Create { app_id, .. } => Some(app_id),
                _ => None,
            })
            .collect()
    }

    pub async fn updates(&self) -> Vec<(String, i64)> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                Call::Update { page_id, app_id } => Some((page_id, app_id)),
                _ => None,
            })
            .collect()
    }

    pub async fn write_count(&self) -> usize {
        self.creates().await.len() + self.updates().await.len()
    }

    pub async fn page(&self, page_id: &str) -> Option<FakePage> {
        self.state.lock().await.pages.get(page_id).cloned()
    }

    fn app_id_of(&self, properties: &Value) -> i64 {
        properties[&self.app_id_property]["number"]
            .as_i64()
            .unwrap_or_default()
    }
}

fn boom() -> NotionError {
    NotionError::Api {
        status: 500,
        body: "boom".into(),
    }
}

#[async_trait]
impl NotionService for FakeNotion {
    async fn create_page(
        &self,
        target: &CollectionTarget,
        properties: Value,
        _cover: Option<Value>,
        children: &[Block],
    ) -> Result<String, NotionError> {
        let app_id = self.app_id_of(&properties);
        let mut state = self.state.lock().await;
        state.calls.push(Call::Create {
            app_id,
            children: children.len(),
        });
        if state.fail_writes_for.contains(&app_id) {
            return Err(boom());
        }
        let page_id = Uuid::new_v4().to_string();
        state.pages.insert(
            page_id.clone(),
            FakePage {
                parent: PageParent {
                    kind: Some("data_source_id".into()),
                    database_id: Some(target.database_id.clone()),
                    data_source_id: target.data_source_id.clone(),
                    page_id: None,
                },
                app_id: Some(app_id),
                trashed: false,
            },
        );
        Ok(page_id)
    }

    async fn update_page(
        &self,
        page_id: &str,
        properties: Value,
        _cover: Option<Value>,
    ) -> Result<(), NotionError> {
        let app_id = self.app_id_of(&properties);
        let mut state = self.state.lock().await;
        state.calls.push(Call::Update {
            page_id: page_id.to_string(),
            app_id,
        });
        if state.fail_writes_for.contains(&app_id) {
            return Err(boom());
        }
        if !state.pages.contains_key(page_id) {
            return Err(NotionError::NotFound(page_id.to_string()));
        }
        Ok(())
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<PageSummary, NotionError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Retrieve(page_id.to_string()));
        if state.fail_retrieves {
            return Err(boom());
        }
        match state.pages.get(page_id) {
            Some(page) => Ok(PageSummary {
                id: page_id.to_string(),
                parent: page.parent.clone(),
                archived: page.trashed,
                in_trash: page.trashed,
            }),
            None => Err(NotionError::NotFound(page_id.to_string())),
        }
    }

    async fn query_by_property(
        &self,
        target: &CollectionTarget,
        _property: &str,
        value: i64,
    ) -> Result<Option<String>, NotionError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Query(value));
        if state.fail_queries {
            return Err(boom());
        }
        let mut found: Vec<&String> = state
            .pages
            .iter()
            .filter(|(_, p)| p.app_id == Some(value) && !p.trashed && target.contains(&p.parent))
            .map(|(id, _)| id)
            .collect();
        found.sort();
        Ok(found.first().map(|id| id.to_string()))
    }

    async fn retrieve_database(&self, database_id: &str) -> Result<DatabaseSummary, NotionError> {
        let mut state = self.state.lock().await;
        state
            .calls
            .push(Call::RetrieveDatabase(database_id.to_string()));
        Ok(DatabaseSummary {
            id: database_id.to_string(),
            title: Vec::new(),
            properties: HashMap::new(),
            data_sources: state
                .database_sources
                .iter()
                .map(|id| DataSourceRef {
                    id: id.clone(),
                    name: None,
                })
                .collect(),
        })
    }

    async fn retrieve_schema(&self, target: &CollectionTarget) -> Result<DatabaseSummary, NotionError> {
        let mut state = self.state.lock().await;
        state
            .calls
            .push(Call::RetrieveSchema(target.database_id.clone()));
        Ok(DatabaseSummary {
            id: target.database_id.clone(),
            title: Vec::new(),
            properties: state
                .schema
                .iter()
                .map(|(name, typ)| {
                    (
                        name.clone(),
                        DatabaseProperty {
                            id: name.clone(),
                            typ: typ.clone(),
                        },
                    )
                })
                .collect(),
            data_sources: Vec::new(),
        })
    }

    async fn update_schema(
        &self,
        _target: &CollectionTarget,
        properties: Value,
    ) -> Result<(), NotionError> {
        let mut state = self.state.lock().await;
        let mut added = Vec::new();
        if let Value::Object(props) = properties {
            for (name, config) in props {
                let typ = config
                    .as_object()
                    .and_then(|c| c.keys().next().cloned())
                    .unwrap_or_default();
                state.schema.insert(name.clone(), typ);
                added.push(name);
            }
        }
        added.sort();
        state.calls.push(Call::UpdateSchema(added));
        Ok(())
    }

    async fn create_database(
        &self,
        parent_page_id: &str,
        _title: &str,
        _properties: Value,
    ) -> Result<DatabaseSummary, NotionError> {
        let mut state = self.state.lock().await;
        state
            .calls
            .push(Call::CreateDatabase(parent_page_id.to_string()));
        Ok(DatabaseSummary {
            id: DB.to_string(),
            title: Vec::new(),
            properties: HashMap::new(),
            data_sources: vec![DataSourceRef {
                id: DS.to_string(),
                name: Some("Steam Game Library".into()),
            }],
        })
    }
}
