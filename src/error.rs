//! Error types.
//!
//! Runtime failures (loader, summarizer, update) never surface as `Err`: they
//! are captured into the lifecycle's `error` string. The only fallible API is
//! collection construction.

use thiserror::Error;

/// Message stored when a failure carries no text of its own.
pub const DEFAULT_FALLBACK_ERROR: &str = "Cannot load data from server";

/// Misconfiguration detected while building a [`Collection`](crate::Collection).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("newZeroSummary function must be given with reducer function")]
    ReducerWithoutZeroSummary,

    #[error("collection must have at least one member")]
    EmptyCollection,

    #[error("duplicate collection key: {0}")]
    DuplicateKey(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Converts a captured callback failure into the message stored on the lifecycle.
pub(crate) fn failure_message(
    error: &anyhow::Error,
    error_override: Option<&str>,
    fallback: &str,
) -> String {
    if let Some(message) = error_override {
        return message.to_string();
    }
    let message = error.to_string();
    if message.is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
