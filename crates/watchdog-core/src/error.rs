//! Error types for the watchdog facade.

use thiserror::Error;

/// Top-level error type for pipeline operations.
#[derive(Debug, Error)]
pub enum WatchdogError {
    /// A judgment strategy failed without a permitted fallback.
    #[error("judgment error: {0}")]
    Judge(#[from] watchdog_judge::JudgeError),

    /// The durable store failed.
    #[error("storage error: {0}")]
    Store(#[from] watchdog_store::StoreError),

    /// Feedback referenced a judgment the log no longer holds. Reported,
    /// non-fatal to the caller.
    #[error("judgment not found: {0}")]
    JudgmentNotFound(String),

    /// The configuration is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, WatchdogError>;
