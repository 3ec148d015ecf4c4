use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Feed fetch error: {0}")]
    Fetch(String),

    #[error("Content extraction error: {0}")]
    Extraction(String),

    #[error("Summarization error: {0}")]
    Summarization(String),

    #[error("Store write error: {0}")]
    StoreWrite(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
