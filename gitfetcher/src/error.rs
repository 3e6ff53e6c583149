use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitFetcherError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("GitHub API error: {0}")]
    GitHub(#[from] octocrab::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GitFetcherError>;
