use thiserror::Error;

use crate::api_client::ApiError;
use crate::store::StoreError;

/// Application-level error type shared by the repositories and services.
///
/// Degraded-but-successful paths (quota truncation, sync fallback, emotion
/// fallback) are not errors — they come back as typed outcomes from the
/// operations themselves. `AppError` is for operations that genuinely did not
/// happen.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Remote API error: {0}")]
    Remote(#[from] ApiError),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
