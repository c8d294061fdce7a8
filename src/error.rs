//! Errors that abort a whole sync run. Per-record failures never reach this
//! type; they are folded into the batch report instead.

use thiserror::Error;

use crate::notion::NotionError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Notion configuration error: {0}")]
    Configuration(String),
    #[error("failed to resolve Notion collection: {0}")]
    Notion(#[from] NotionError),
    #[error("database error: {0:#}")]
    Database(#[from] anyhow::Error),
}
