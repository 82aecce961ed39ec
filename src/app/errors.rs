use crate::semantic::{IndexError, RankError};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("memory not found: {0}")]
    NotFound(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("vector store error: {0}")]
    Store(#[from] IndexError),

    #[error("ranking error: {0}")]
    Rank(RankError),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

impl From<RankError> for AppError {
    fn from(err: RankError) -> Self {
        match err {
            RankError::InvalidParameter(msg) => AppError::InvalidParameter(msg),
            other => AppError::Rank(other),
        }
    }
}
