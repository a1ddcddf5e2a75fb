use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid group key: {0}")]
    InvalidGroupKey(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Page store error: {0}")]
    Store(String),

    #[error("Unknown scoring filter: {0}")]
    UnknownScoringFilter(String),

    #[error("Unknown fetch schedule: {0}")]
    UnknownFetchSchedule(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;
