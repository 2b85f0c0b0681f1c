//! Error types for fetched results.

use crate::types::ItemId;
use thiserror::Error;

/// Main error type for controller and store operations.
#[derive(Debug, Error)]
pub enum ResultsError {
    /// The query engine failed while executing a fetch or grouped count.
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Controller has not been fetched")]
    NotFetched,

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Item already exists: {0}")]
    ItemExists(ItemId),

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The change notification channel was disconnected by its source.
    #[error("Change subscription lost")]
    SubscriptionLost,
}

impl From<serde_json::Error> for ResultsError {
    fn from(e: serde_json::Error) -> Self {
        ResultsError::Serialization(e.to_string())
    }
}

/// Result type for fetched results operations.
pub type Result<T> = std::result::Result<T, ResultsError>;
