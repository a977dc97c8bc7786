//! Language-model review of heuristic outcomes.

pub mod ollama;
pub mod reviewer;

use thiserror::Error;

pub use ollama::{extract_json, OllamaClient};
pub use reviewer::{AiReviewer, OllamaReviewer, Review, ReviewRequest};

#[derive(Debug, Error)]
pub enum AiError {
    #[error("ollama request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("ollama returned HTTP {0}")]
    Status(u16),

    #[error("model answer is not JSON: {0}")]
    Unparseable(String),

    #[error("AI reviewer not configured")]
    NotConfigured,
}
