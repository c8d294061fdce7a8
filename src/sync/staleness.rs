use chrono::{DateTime, Utc};

use crate::model::{GameRecord, PageMapping};

/// Whether the mapped page already reflects `record`.
///
/// Requires a page id and a sync timestamp; each source timestamp that is
/// present must not be newer than that sync. Absent source timestamps never
/// block freshness.
pub fn is_up_to_date(record: &GameRecord, mapping: &PageMapping) -> bool {
    let (Some(_), Some(synced_at)) = (&mapping.page_id, mapping.synced_at) else {
        return false;
    };
    let fresh = |changed: Option<DateTime<Utc>>| changed.map_or(true, |t| t <= synced_at);
    fresh(record.ug_updated_at) && fresh(record.gd_updated_at)
}
