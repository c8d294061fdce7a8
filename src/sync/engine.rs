use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use super::content::{self, HtmlParser, MarkupParser};
use super::properties;
use super::reconcile::Reconciler;
use super::staleness::is_up_to_date;
use super::writer::{PageWrite, PageWriter, RequestPacer};
use crate::config::{self, Config};
use crate::db::{self, Pool};
use crate::error::SyncError;
use crate::model::{BatchSyncReport, SyncCandidate, SyncResult};
use crate::notion::provision::resolve_target;
use crate::notion::{CollectionTarget, NotionService};

/// Knobs for one syncer instance.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub notion: config::Notion,
    pub request_interval: Duration,
    pub backfill_limit: i64,
}

impl SyncSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            notion: cfg.notion.clone(),
            request_interval: Duration::from_millis(cfg.app.request_interval_ms),
            backfill_limit: cfg.app.backfill_limit,
        }
    }
}

/// Drives reconcile → staleness → transform → write for a user's library.
///
/// Records are processed one at a time: the pacer bounds the outbound rate and
/// mapping rows are never written concurrently. The target collection is
/// resolved once per syncer, so a provisioned database is created only once.
pub struct NotionSyncer<'a> {
    pool: &'a Pool,
    notion: &'a dyn NotionService,
    parser: &'a dyn MarkupParser,
    settings: SyncSettings,
    target: OnceCell<CollectionTarget>,
}

impl<'a> NotionSyncer<'a> {
    pub fn new(pool: &'a Pool, notion: &'a dyn NotionService, settings: SyncSettings) -> Self {
        Self {
            pool,
            notion,
            parser: &HtmlParser,
            settings,
            target: OnceCell::new(),
        }
    }

    pub fn with_parser(mut self, parser: &'a dyn MarkupParser) -> Self {
        self.parser = parser;
        self
    }

    /// Collection this syncer writes into. Resolution (and provisioning) runs
    /// on first use; failures are not cached.
    pub async fn target(&self) -> Result<CollectionTarget, SyncError> {
        self.target
            .get_or_try_init(|| resolve_target(self.notion, &self.settings.notion))
            .await
            .cloned()
    }

    fn pacer(&self) -> RequestPacer {
        RequestPacer::new(self.settings.request_interval)
    }

    fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(self.notion, self.pool, &self.settings.notion.fields.app_id)
    }

    fn writer(&self) -> PageWriter<'_> {
        PageWriter::new(self.notion, self.pool, self.pacer())
    }

    /// Sync a single candidate. Errors are left to the caller; `sync_batch`
    /// turns them into failed results.
    #[instrument(skip_all, fields(app_id = candidate.record.app_id))]
    pub async fn sync_one(
        &self,
        target: &CollectionTarget,
        candidate: SyncCandidate,
    ) -> Result<SyncResult> {
        let SyncCandidate { record, mapping } = candidate;
        let mapping = self
            .reconciler()
            .reconcile(target, &record, mapping)
            .await?;

        if is_up_to_date(&record, &mapping) {
            return Ok(SyncResult::skipped(record.app_id, mapping.page_id));
        }

        let synced_at = Utc::now();
        let write = PageWrite {
            properties: properties::build_properties(
                &self.settings.notion.fields,
                &record,
                synced_at,
            ),
            cover: properties::build_cover(&record),
            children: content::to_blocks(self.parser, record.description.as_deref()),
            synced_at,
        };

        let existing = mapping.page_id.as_deref();
        let page_id = self
            .writer()
            .upsert_page(target, record.app_id, write, existing)
            .await?;

        Ok(match existing {
            None => SyncResult::created(record.app_id, page_id),
            Some(_) => SyncResult::updated(record.app_id, page_id),
        })
    }

    /// Adopt existing Notion pages for library entries that have no mapping
    /// row at all. Best effort: failures are logged and the count of recovered
    /// mappings is returned.
    #[instrument(skip_all)]
    pub async fn backfill_missing(&self, target: &CollectionTarget, user_id: &str) -> usize {
        let app_ids =
            match db::query_missing_mappings(self.pool, user_id, self.settings.backfill_limit)
                .await
            {
                Ok(ids) => ids,
                Err(err) => {
                    warn!(error = %format!("{err:#}"), "skipping mapping backfill");
                    return 0;
                }
            };

        let reconciler = self.reconciler();
        let pacer = self.pacer();
        let mut recovered = 0;
        for app_id in app_ids {
            let found = reconciler.lookup_page(target, app_id).await;
            pacer.pause().await;
            let Some(page_id) = found else {
                continue;
            };
            match db::upsert_mapping(self.pool, app_id, &page_id, None).await {
                Ok(()) => recovered += 1,
                Err(err) => {
                    warn!(app_id, error = %format!("{err:#}"), "failed to store backfilled mapping")
                }
            }
        }

        if recovered > 0 {
            info!(recovered, "backfilled Notion mappings");
        }
        recovered
    }

    /// Sync every library entry of `user_id`, or only those changed after
    /// `since`. Fails only when the target collection cannot be resolved or the
    /// candidates cannot be read; per-record failures land in the report.
    pub async fn sync_batch(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<BatchSyncReport, SyncError> {
        let target = self.target().await?;
        self.sync_batch_with_target(&target, user_id, since).await
    }

    /// [`Self::sync_batch`] against an already resolved collection.
    #[instrument(skip_all, fields(user_id = user_id))]
    pub async fn sync_batch_with_target(
        &self,
        target: &CollectionTarget,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<BatchSyncReport, SyncError> {
        self.backfill_missing(target, user_id).await;

        let candidates = db::query_candidates(self.pool, user_id, since).await?;
        let total = candidates.len();
        info!(total, since = ?since, "syncing games to Notion");

        let mut results = Vec::with_capacity(total);
        for candidate in candidates {
            let app_id = candidate.record.app_id;
            match self.sync_one(target, candidate).await {
                Ok(result) => results.push(result),
                Err(err) => {
                    let message = format!("{err:#}");
                    warn!(app_id, error = %message, "failed to sync game to Notion");
                    results.push(SyncResult::failed(app_id, message));
                }
            }
        }

        let report = BatchSyncReport::from_results(total, results);
        info!(
            total = report.total,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            "Notion sync finished"
        );
        Ok(report)
    }
}
