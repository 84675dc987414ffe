use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Corrupt column {column} for version {id}: {reason}")]
    CorruptColumn {
        id: String,
        column: &'static str,
        reason: String,
    },

    #[error("Database lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Request limiter closed")]
    LimiterClosed,
}

/// Reasons a raw record does not match the expected shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),
}
