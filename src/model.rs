use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One game owned by one user, joined from `user_games` and `game_details`.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub app_id: i64,
    pub name: Option<String>,
    pub playtime_minutes: Option<i64>,
    pub last_played: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub header_image: Option<String>,
    /// Last change of the per-user usage row.
    pub ug_updated_at: Option<DateTime<Utc>>,
    /// Last change of the store detail row.
    pub gd_updated_at: Option<DateTime<Utc>>,
}

/// Local association between an app id and its Notion page.
///
/// An invalidated mapping keeps its `app_id` but has neither a page id nor a
/// sync timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMapping {
    pub app_id: i64,
    pub page_id: Option<String>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl PageMapping {
    pub fn missing(app_id: i64) -> Self {
        Self {
            app_id,
            page_id: None,
            synced_at: None,
        }
    }

    pub fn invalidate(&mut self) {
        self.page_id = None;
        self.synced_at = None;
    }
}

/// A candidate row handed to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncCandidate {
    pub record: GameRecord,
    pub mapping: PageMapping,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Created,
    Updated,
    Skipped,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Created => "created",
            SyncStatus::Updated => "updated",
            SyncStatus::Skipped => "skipped",
        }
    }
}

/// Per-record outcome. A failure is a `skipped` result that carries an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub app_id: i64,
    pub status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notion_page_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResult {
    pub fn created(app_id: i64, page_id: String) -> Self {
        Self {
            app_id,
            status: SyncStatus::Created,
            notion_page_id: Some(page_id),
            error: None,
        }
    }

    pub fn updated(app_id: i64, page_id: String) -> Self {
        Self {
            app_id,
            status: SyncStatus::Updated,
            notion_page_id: Some(page_id),
            error: None,
        }
    }

    pub fn skipped(app_id: i64, page_id: Option<String>) -> Self {
        Self {
            app_id,
            status: SyncStatus::Skipped,
            notion_page_id: page_id,
            error: None,
        }
    }

    pub fn failed(app_id: i64, error: impl Into<String>) -> Self {
        Self {
            app_id,
            status: SyncStatus::Skipped,
            notion_page_id: None,
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregate over one `sync_batch` invocation. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchSyncReport {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<SyncResult>,
}

impl BatchSyncReport {
    pub fn from_results(total: usize, results: Vec<SyncResult>) -> Self {
        let count = |status: SyncStatus| {
            results
                .iter()
                .filter(|r| r.status == status && !r.is_failure())
                .count()
        };
        Self {
            total,
            created: count(SyncStatus::Created),
            updated: count(SyncStatus::Updated),
            skipped: count(SyncStatus::Skipped),
            failed: results.iter().filter(|r| r.is_failure()).count(),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_counts_failures_separately_from_skips() {
        let report = BatchSyncReport::from_results(
            4,
            vec![
                SyncResult::created(1, "p1".into()),
                SyncResult::skipped(2, Some("p2".into())),
                SyncResult::failed(3, "boom"),
                SyncResult::updated(4, "p4".into()),
            ],
        );
        assert_eq!(report.total, 4);
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn report_serializes_with_camel_case_results() {
        let report = BatchSyncReport::from_results(
            2,
            vec![
                SyncResult::created(10, "page-10".into()),
                SyncResult::failed(11, "notion error 500"),
            ],
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            json!({
                "total": 2,
                "created": 1,
                "updated": 0,
                "skipped": 0,
                "failed": 1,
                "results": [
                    { "appId": 10, "status": "created", "notionPageId": "page-10" },
                    { "appId": 11, "status": "skipped", "error": "notion error 500" }
                ]
            })
        );
    }

    #[test]
    fn invalidate_clears_page_and_timestamp() {
        let mut mapping = PageMapping {
            app_id: 7,
            page_id: Some("p".into()),
            synced_at: Some(Utc::now()),
        };
        mapping.invalidate();
        assert_eq!(mapping, PageMapping::missing(7));
    }
}
