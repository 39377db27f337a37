use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("A collection run is already in progress")]
    Busy,

    #[error("Invalid run configuration: {0}")]
    InvalidRun(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Settings(#[from] crate::config::ConfigError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
