//! The inference transport seam.
//!
//! The pipeline never talks to a model directly; it sends a prompt
//! through an [`InferenceTransport`] and gets text back. The concrete
//! transport (local server, remote API, test double) lives outside this
//! workspace.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// A prompt plus generation options.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// The full prompt text.
    pub prompt: String,
    /// Model identifier understood by the transport.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Output size bound.
    pub max_tokens: u32,
    /// How long the caller is willing to wait.
    pub timeout: Duration,
}

/// The transport's answer.
#[derive(Debug, Clone)]
pub struct InferenceReply {
    /// Raw response text; strategies parse structure out of it.
    pub text: String,
    /// How long the call took.
    pub latency: Duration,
}

/// An external reasoning backend.
///
/// Implementations must resolve every call to a reply, a
/// [`Transport`](crate::JudgeError::Transport) error, or a
/// [`Timeout`](crate::JudgeError::Timeout) error — never hang. The
/// calling strategy additionally enforces its own timeout around `send`.
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    /// Stable identifier for logs and votes.
    fn id(&self) -> &str;

    /// Sends a request and returns the raw reply.
    async fn send(&self, request: &InferenceRequest) -> Result<InferenceReply>;
}
