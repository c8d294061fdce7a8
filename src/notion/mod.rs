use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, warn};

pub mod error;
pub mod model;
pub mod provision;

pub use error::NotionError;
pub use model::{Block, CollectionTarget, DatabaseSummary, PageParent, PageSummary};

use model::{CreatedObject, QueryResp};

const NOTION_API_BASE: &str = "https://api.notion.com/";

/// First API version that addresses collections through data sources.
const DATA_SOURCE_API_VERSION: &str = "2025-09-03";

/// Matches per lookup. More than one lets a live page be found when the first
/// hit is already in trash.
const QUERY_PAGE_SIZE: u32 = 10;

#[derive(Clone)]
pub struct NotionClient {
    http: Client,
    base_url: Url,
    token: String,
    version: String,
}

impl fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Remote operations the sync engine needs from the target store.
#[async_trait]
pub trait NotionService: Send + Sync {
    async fn create_page(
        &self,
        target: &CollectionTarget,
        properties: Value,
        cover: Option<Value>,
        children: &[Block],
    ) -> Result<String, NotionError>;

    async fn update_page(
        &self,
        page_id: &str,
        properties: Value,
        cover: Option<Value>,
    ) -> Result<(), NotionError>;

    /// Fails with [`NotionError::NotFound`] when the page does not exist.
    async fn retrieve_page(&self, page_id: &str) -> Result<PageSummary, NotionError>;

    /// First page in `target` whose number property `property` equals `value`.
    async fn query_by_property(
        &self,
        target: &CollectionTarget,
        property: &str,
        value: i64,
    ) -> Result<Option<String>, NotionError>;

    async fn retrieve_database(&self, database_id: &str) -> Result<DatabaseSummary, NotionError>;

    /// Property schema of `target`: the data source when one is addressed,
    /// the database otherwise.
    async fn retrieve_schema(&self, target: &CollectionTarget) -> Result<DatabaseSummary, NotionError>;

    /// Add or change properties on `target`. Properties not named are kept.
    async fn update_schema(
        &self,
        target: &CollectionTarget,
        properties: Value,
    ) -> Result<(), NotionError>;

    async fn create_database(
        &self,
        parent_page_id: &str,
        title: &str,
        properties: Value,
    ) -> Result<DatabaseSummary, NotionError>;
}

impl NotionClient {
    pub fn new(token: String, version: String) -> Self {
        let base_url = Url::parse(NOTION_API_BASE).expect("valid default Notion URL");
        Self::with_base_url(token, version, base_url)
    }

    pub fn with_base_url(token: String, version: String, base_url: Url) -> Self {
        let http = Client::builder()
            .user_agent("steam-notion-sync/0.1")
            .no_proxy()
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            token,
            version,
        }
    }

    fn uses_data_sources(&self) -> bool {
        self.version.as_str() >= DATA_SOURCE_API_VERSION
    }

    /// Path of the collection object itself, before any `/query` suffix.
    fn collection_path(&self, target: &CollectionTarget) -> String {
        match (&target.data_source_id, self.uses_data_sources()) {
            (Some(ds), true) => format!("v1/data_sources/{}", ds),
            _ => format!("v1/databases/{}", target.database_id),
        }
    }

    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Request, NotionError> {
        let endpoint = self
            .base_url
            .join(path)
            .map_err(|e| NotionError::InvalidUrl(format!("{}: {}", path, e)))?;
        let mut builder = self
            .http
            .request(method, endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", &self.version);
        if let Some(body) = body {
            builder = builder
                .header("Content-Type", "application/json")
                .json(body);
        }
        Ok(builder.build()?)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, NotionError> {
        let request = self.build_request(method, path, body)?;
        debug!(method=%request.method(), url=%request.url(), "sending notion request");
        let res = self.http.execute(request).await?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!(path, "rate limited by Notion");
            return Err(NotionError::RateLimited(body));
        }
        if status == StatusCode::NOT_FOUND {
            let body = res.text().await.unwrap_or_default();
            return Err(NotionError::NotFound(body));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(path, status = status.as_u16(), "notion api error");
            return Err(NotionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(res.json::<T>().await?)
    }

    /// Retrieve a data source, which carries the property schema on newer API versions.
    pub async fn retrieve_data_source(
        &self,
        data_source_id: &str,
    ) -> Result<DatabaseSummary, NotionError> {
        self.send(
            Method::GET,
            &format!("v1/data_sources/{}", data_source_id),
            None,
        )
        .await
    }
}

#[async_trait]
impl NotionService for NotionClient {
    async fn create_page(
        &self,
        target: &CollectionTarget,
        properties: Value,
        cover: Option<Value>,
        children: &[Block],
    ) -> Result<String, NotionError> {
        let body = build_create_page_request(target, properties, cover, children);
        let created: CreatedObject = self.send(Method::POST, "v1/pages", Some(&body)).await?;
        Ok(created.id)
    }

    async fn update_page(
        &self,
        page_id: &str,
        properties: Value,
        cover: Option<Value>,
    ) -> Result<(), NotionError> {
        let body = build_update_page_request(properties, cover);
        let _: Value = self
            .send(Method::PATCH, &format!("v1/pages/{}", page_id), Some(&body))
            .await?;
        Ok(())
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<PageSummary, NotionError> {
        self.send(Method::GET, &format!("v1/pages/{}", page_id), None)
            .await
    }

    async fn query_by_property(
        &self,
        target: &CollectionTarget,
        property: &str,
        value: i64,
    ) -> Result<Option<String>, NotionError> {
        let path = format!("{}/query", self.collection_path(target));
        let body = build_query_by_number_request(property, value);
        let resp: QueryResp = self.send(Method::POST, &path, Some(&body)).await?;
        Ok(resp
            .results
            .into_iter()
            .find(|page| !page.is_trashed())
            .map(|page| page.id))
    }

    async fn retrieve_database(&self, database_id: &str) -> Result<DatabaseSummary, NotionError> {
        self.send(Method::GET, &format!("v1/databases/{}", database_id), None)
            .await
    }

    async fn retrieve_schema(&self, target: &CollectionTarget) -> Result<DatabaseSummary, NotionError> {
        self.send(Method::GET, &self.collection_path(target), None)
            .await
    }

    async fn update_schema(
        &self,
        target: &CollectionTarget,
        properties: Value,
    ) -> Result<(), NotionError> {
        let body = json!({ "properties": properties });
        let _: Value = self
            .send(Method::PATCH, &self.collection_path(target), Some(&body))
            .await?;
        Ok(())
    }

    async fn create_database(
        &self,
        parent_page_id: &str,
        title: &str,
        properties: Value,
    ) -> Result<DatabaseSummary, NotionError> {
        let body =
            build_create_database_request(parent_page_id, title, properties, self.uses_data_sources());
        self.send(Method::POST, "v1/databases", Some(&body)).await
    }
}

pub fn build_create_page_request(
    target: &CollectionTarget,
    properties: Value,
    cover: Option<Value>,
    children: &[Block],
) -> Value {
    let parent = match &target.data_source_id {
        Some(ds) => json!({ "type": "data_source_id", "data_source_id": ds }),
        None => json!({ "type": "database_id", "database_id": target.database_id }),
    };
    let mut body = json!({
        "parent": parent,
        "properties": properties,
        "children": children.iter().map(Block::to_json).collect::<Vec<_>>(),
    });
    if let Some(cover) = cover {
        body["cover"] = cover;
    }
    body
}

/// Update touches properties and cover only; the page body is left as is.
pub fn build_update_page_request(properties: Value, cover: Option<Value>) -> Value {
    let mut body = json!({ "properties": properties });
    if let Some(cover) = cover {
        body["cover"] = cover;
    }
    body
}

pub fn build_query_by_number_request(property: &str, value: i64) -> Value {
    json!({
        "filter": {
            "property": property,
            "number": { "equals": value }
        },
        "page_size": QUERY_PAGE_SIZE
    })
}

pub fn build_create_database_request(
    parent_page_id: &str,
    title: &str,
    properties: Value,
    data_sources: bool,
) -> Value {
    let mut body = json!({
        "parent": { "type": "page_id", "page_id": parent_page_id },
        "title": [ { "type": "text", "text": { "content": title } } ],
    });
    if data_sources {
        body["initial_data_source"] = json!({ "properties": properties });
    } else {
        body["properties"] = properties;
    }
    body
}
