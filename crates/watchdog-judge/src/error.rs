//! Error types for the judgment strategies.
//!
//! Transport, timeout, and malformed-response failures are all
//! recoverable: at the consensus layer they mean "this source abstained",
//! and at the caller they mean "fall back to the next cheaper strategy".
//! Only total unavailability and malformed caller input propagate.

use thiserror::Error;

/// Result type alias for judgment operations.
pub type Result<T> = std::result::Result<T, JudgeError>;

/// Errors that can occur while producing a judgment.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The backend could not be reached or failed mid-call.
    #[error("transport failure from '{source_id}': {detail}")]
    Transport {
        /// The failing source.
        source_id: String,
        /// What went wrong.
        detail: String,
    },

    /// The backend did not answer within its timeout.
    #[error("source '{source_id}' timed out after {after_ms}ms")]
    Timeout {
        /// The timed-out source.
        source_id: String,
        /// The timeout that elapsed.
        after_ms: u64,
    },

    /// The backend answered, but no well-formed payload could be parsed.
    #[error("malformed response from '{source_id}': {detail}")]
    MalformedResponse {
        /// The offending source.
        source_id: String,
        /// Parse failure description.
        detail: String,
    },

    /// Every configured source failed; the caller must fall back.
    #[error("no judgment sources available")]
    NoSourcesAvailable,

    /// The caller handed the static scorer unusable input. Programmer
    /// error, fatal to that call only.
    #[error("invalid trigger: {0}")]
    InvalidTrigger(String),
}

impl JudgeError {
    /// True for failures that mean "this source abstained" rather than
    /// "the operation failed".
    pub fn is_abstention(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::MalformedResponse { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_source() {
        let err = JudgeError::Timeout {
            source_id: "local-7b".to_string(),
            after_ms: 30_000,
        };
        assert!(err.to_string().contains("local-7b"));
        assert!(err.to_string().contains("30000"));
    }

    #[test]
    fn test_abstention_classification() {
        assert!(JudgeError::Transport {
            source_id: "a".into(),
            detail: "refused".into()
        }
        .is_abstention());
        assert!(JudgeError::MalformedResponse {
            source_id: "a".into(),
            detail: "no json".into()
        }
        .is_abstention());
        assert!(!JudgeError::NoSourcesAvailable.is_abstention());
        assert!(!JudgeError::InvalidTrigger("empty".into()).is_abstention());
    }
}
