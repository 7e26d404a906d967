#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
    #[error("Rate table not found")]
    TableNotFound,
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

impl From<reqwest::Error> for ExtractionError {
    fn from(e: reqwest::Error) -> Self {
        ExtractionError::FetchFailed(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Storage unavailable")]
    StorageUnavailable(#[from] sqlx::error::Error),
    #[error("Invalid stored payload")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    History(#[from] HistoryError),
}
