use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("bad scheme '{0}': expected http or https")]
    InvalidScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
