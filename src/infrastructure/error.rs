use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Calendar feed error: {0}")]
    Feed(String),
    #[error("Calendar feed rejected the access token")]
    Unauthorized,
    #[error("Calendar access token expired")]
    TokenExpired,
}
