use thiserror::Error;

use crate::tips::TipError;

#[derive(Error, Debug)]
pub enum FeedTipsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Tip(#[from] TipError),
}

pub type Result<T> = std::result::Result<T, FeedTipsError>;
