use thiserror::Error;

use crate::RequestId;

#[derive(Error, Debug)]
pub enum DriftError {
    #[error("Invalid benchmark: {0}")]
    InvalidBenchmark(String),

    #[error("Request not found: {0}")]
    RequestNotFound(RequestId),

    #[error("Benchmark group not found: {0}")]
    GroupNotFound(usize),

    #[error("Benchmark {index} not found in group {group_id}")]
    BenchmarkNotFound { group_id: usize, index: usize },

    #[error("Benchmark {index} in group {group_id} already resolved")]
    AlreadyResolved { group_id: usize, index: usize },

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DriftError>;
