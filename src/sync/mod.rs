//! One-way Steam library → Notion synchronization.
//!
//! - `staleness`: decides whether a mapped page is current.
//! - `content`: description markup → page blocks.
//! - `properties`: page properties and cover.
//! - `reconcile`: validates and recovers page mappings.
//! - `writer`: paced create/update plus mapping persistence.
//! - `engine`: per-record pipeline and batch runs.

pub mod content;
pub mod engine;
pub mod properties;
pub mod reconcile;
pub mod staleness;
pub mod writer;

pub use engine::{NotionSyncer, SyncSettings};
pub use staleness::is_up_to_date;
