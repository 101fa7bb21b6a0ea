use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Service manager unavailable: {0}")]
    Connect(String),

    #[error("Service not found: {0}")]
    NotFound(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Start failed: {0}")]
    Start(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
