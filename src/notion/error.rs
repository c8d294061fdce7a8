use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotionError {
    #[error("notion object not found: {0}")]
    NotFound(String),
    #[error("received 429 from Notion: {0}")]
    RateLimited(String),
    #[error("notion error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to reach Notion: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid Notion URL: {0}")]
    InvalidUrl(String),
}

impl NotionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, NotionError::NotFound(_))
    }
}
