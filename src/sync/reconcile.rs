//! Checks a stored mapping against Notion before it is trusted.
//!
//! Only persistence failures escape as errors. Lookup failures are logged and
//! resolved towards "no page", which at worst costs an extra write.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::db::{self, Pool};
use crate::model::{GameRecord, PageMapping};
use crate::notion::{CollectionTarget, NotionService};

pub struct Reconciler<'a> {
    notion: &'a dyn NotionService,
    pool: &'a Pool,
    /// Number property holding the app id on every page.
    app_id_property: &'a str,
}

impl<'a> Reconciler<'a> {
    pub fn new(notion: &'a dyn NotionService, pool: &'a Pool, app_id_property: &'a str) -> Self {
        Self {
            notion,
            pool,
            app_id_property,
        }
    }

    /// Return the mapping to use for this cycle.
    ///
    /// A mapped page must exist, not be trashed and sit in `target`; otherwise
    /// the mapping is cleared, stored row included. A missing page id is then
    /// looked up by app id, and an adopted page is persisted right away with no
    /// sync time so the next step refreshes it instead of creating a duplicate.
    #[instrument(skip_all, fields(app_id = record.app_id))]
    pub async fn reconcile(
        &self,
        target: &CollectionTarget,
        record: &GameRecord,
        mut mapping: PageMapping,
    ) -> Result<PageMapping> {
        mapping.app_id = record.app_id;
        self.validate(target, &mut mapping).await?;

        if mapping.page_id.is_none() {
            if let Some(page_id) = self.lookup_page(target, record.app_id).await {
                info!(app_id = record.app_id, page_id = %page_id, "recovered lost Notion mapping");
                db::upsert_mapping(self.pool, record.app_id, &page_id, None).await?;
                mapping.page_id = Some(page_id);
                mapping.synced_at = None;
            }
        }

        Ok(mapping)
    }

    /// Clear `mapping`, in memory and in the store, when its page is missing,
    /// trashed, outside `target` or cannot be verified.
    async fn validate(&self, target: &CollectionTarget, mapping: &mut PageMapping) -> Result<()> {
        let Some(page_id) = mapping.page_id.clone() else {
            return Ok(());
        };

        let valid = match self.notion.retrieve_page(&page_id).await {
            Ok(page) if page.is_trashed() => {
                info!(app_id = mapping.app_id, page_id = %page_id, "mapped page is in trash; invalidating");
                false
            }
            Ok(page) if !target.contains(&page.parent) => {
                warn!(
                    app_id = mapping.app_id,
                    page_id = %page_id,
                    parent = ?page.parent,
                    "mapped page lives outside the target collection; invalidating"
                );
                false
            }
            Ok(_) => true,
            Err(err) if err.is_not_found() => {
                info!(app_id = mapping.app_id, page_id = %page_id, "mapped page no longer exists; invalidating");
                false
            }
            Err(err) => {
                warn!(
                    app_id = mapping.app_id,
                    page_id = %page_id,
                    error = %err,
                    "failed to verify mapped page; invalidating"
                );
                false
            }
        };

        if !valid {
            mapping.invalidate();
            db::clear_mapping(self.pool, mapping.app_id).await?;
        }
        Ok(())
    }

    /// Find an existing page for `app_id` in `target`. Query failures count as
    /// "not found".
    pub async fn lookup_page(&self, target: &CollectionTarget, app_id: i64) -> Option<String> {
        match self
            .notion
            .query_by_property(target, self.app_id_property, app_id)
            .await
        {
            Ok(found) => found,
            Err(err) => {
                warn!(app_id, error = %err, "failed to query Notion for existing page");
                None
            }
        }
    }
}
