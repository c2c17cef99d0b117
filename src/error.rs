//! Error types for the SpendPal assistant engine

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Core Engine Errors
    // =============================

    #[error("Assistant is busy with another submission")]
    Busy,

    #[error("Invalid tool arguments: {0}")]
    InvalidToolArgs(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}
