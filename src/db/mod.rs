//! Database module: row models and SQL repositories.
//!
//! - `model`: rows as returned by queries, plus the upstream input rows.
//! - `repo`: SQL-only functions that map rows into domain types.
//!
//! External modules should import from `steam_notion_sync::db`; the repository
//! API is re-exported here.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{GameDetail, UserGame};
