use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::db::{self, Pool};
use crate::notion::{Block, CollectionTarget, NotionService};

/// Fixed pause after each outbound call. At 400ms a run stays under 2.5
/// requests per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPacer {
    interval: Duration,
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub async fn pause(&self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Everything a page write needs besides its identity.
#[derive(Debug, Clone)]
pub struct PageWrite {
    pub properties: Value,
    pub cover: Option<Value>,
    pub children: Vec<Block>,
    /// Stored as the mapping's sync time once the write succeeds.
    pub synced_at: DateTime<Utc>,
}

pub struct PageWriter<'a> {
    notion: &'a dyn NotionService,
    pool: &'a Pool,
    pacer: RequestPacer,
}

impl<'a> PageWriter<'a> {
    pub fn new(notion: &'a dyn NotionService, pool: &'a Pool, pacer: RequestPacer) -> Self {
        Self {
            notion,
            pool,
            pacer,
        }
    }

    /// Create the page when `existing_page_id` is `None`, otherwise refresh its
    /// properties and cover. The mapping is persisted after a successful write.
    /// Remote failures are returned as is; there is no retry here.
    #[instrument(skip_all, fields(app_id = app_id))]
    pub async fn upsert_page(
        &self,
        target: &CollectionTarget,
        app_id: i64,
        write: PageWrite,
        existing_page_id: Option<&str>,
    ) -> Result<String> {
        let page_id = match existing_page_id {
            None => {
                let created = self
                    .notion
                    .create_page(target, write.properties, write.cover, &write.children)
                    .await;
                self.pacer.pause().await;
                let page_id = created
                    .with_context(|| format!("failed to create Notion page for app {}", app_id))?;
                debug!(app_id, page_id = %page_id, "created Notion page");
                page_id
            }
            Some(page_id) => {
                let updated = self
                    .notion
                    .update_page(page_id, write.properties, write.cover)
                    .await;
                self.pacer.pause().await;
                updated.with_context(|| {
                    format!("failed to update Notion page {} for app {}", page_id, app_id)
                })?;
                debug!(app_id, page_id, "updated Notion page");
                page_id.to_string()
            }
        };

        db::upsert_mapping(self.pool, app_id, &page_id, Some(write.synced_at)).await?;
        Ok(page_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn pacer_waits_at_least_the_interval() {
        let pacer = RequestPacer::new(Duration::from_millis(30));
        let start = Instant::now();
        pacer.pause().await;
        pacer.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn zero_interval_does_not_sleep() {
        let pacer = RequestPacer::new(Duration::ZERO);
        let start = Instant::now();
        pacer.pause().await;
        assert!(start.elapsed() < Duration::from_millis(20));
    }
}
