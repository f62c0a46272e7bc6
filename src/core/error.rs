use thiserror::Error;

/// Failure taxonomy for a single extraction attempt. Everything here is
/// fatal for the attempt; retries, if any, are the caller's business.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("URL does not match the expected embed pattern: {0}")]
    PatternMismatch(String),

    #[error("metadata request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("metadata document is missing required field `{0}`")]
    MissingField(&'static str),
}
