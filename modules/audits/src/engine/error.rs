use thiserror::Error;

use super::fetcher::FetchError;

/// Failures that abort an audit run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not parse document: {0}")]
    Parse(String),

    #[error("evaluation task failed: {0}")]
    Task(String),
}
