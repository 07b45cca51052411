//! Error types for the biosignature engine

use thiserror::Error;

/// Errors that can occur during configuration or computation
///
/// Per-call data problems (non-finite readings, thin weeks, missing primary
/// signal) are not errors; they surface as defaults or explicit outcomes.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid weight table '{name}': weights sum to {sum}%")]
    InvalidWeights { name: &'static str, sum: u32 },

    #[error("Date out of range: {0}")]
    DateOutOfRange(String),
}
