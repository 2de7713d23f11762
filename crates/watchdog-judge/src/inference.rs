//! Single-backend inference judgment.
//!
//! Sends a structured prompt through an [`InferenceTransport`], parses
//! the first well-formed JSON object out of the reply, clamps every field
//! into range, and applies the bounding invariant. All failures are
//! recoverable — the caller falls back to static scoring.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use watchdog_observe::Clock;

use crate::axioms::Axiom;
use crate::bound::ConfidenceBounds;
use crate::error::{JudgeError, Result};
use crate::judgment::{Judgment, JudgmentSource};
use crate::specificity::SpecificityEstimator;
use crate::strategy::{JudgmentItem, SourceJudge};
use crate::transport::{InferenceRequest, InferenceTransport};
use crate::verdict::Verdict;

/// Default per-call timeout.
pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Generation options for one backend.
#[derive(Debug, Clone)]
pub struct InferenceOptions {
    /// Model identifier understood by the transport.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Output size bound.
    pub max_tokens: u32,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            temperature: 0.2,
            max_tokens: 768,
            timeout: DEFAULT_INFERENCE_TIMEOUT,
        }
    }
}

/// The reply shape requested from the backend.
#[derive(Debug, Deserialize)]
struct RawAssessment {
    #[serde(default)]
    q_score: f64,
    #[serde(default)]
    verdict: Option<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    axiom_scores: BTreeMap<String, f64>,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    recommendation: String,
}

/// Judgment via one external reasoning backend.
pub struct InferenceStrategy {
    transport: Arc<dyn InferenceTransport>,
    options: InferenceOptions,
    clock: Arc<dyn Clock>,
    bounds: ConfidenceBounds,
    specificity: Arc<dyn SpecificityEstimator>,
}

impl InferenceStrategy {
    /// Creates a strategy with default options.
    pub fn new(
        transport: Arc<dyn InferenceTransport>,
        clock: Arc<dyn Clock>,
        specificity: Arc<dyn SpecificityEstimator>,
    ) -> Self {
        Self {
            transport,
            options: InferenceOptions::default(),
            clock,
            bounds: ConfidenceBounds::new(),
            specificity,
        }
    }

    /// Overrides the generation options.
    #[must_use]
    pub fn with_options(mut self, options: InferenceOptions) -> Self {
        self.options = options;
        self
    }

    /// The transport identifier.
    pub fn source_id(&self) -> &str {
        self.transport.id()
    }

    /// Judges an item through the backend.
    ///
    /// # Errors
    ///
    /// [`JudgeError::Timeout`], [`JudgeError::Transport`], or
    /// [`JudgeError::MalformedResponse`] — all recoverable.
    pub async fn judge(&self, item: &JudgmentItem, context: &str) -> Result<Judgment> {
        let request = InferenceRequest {
            prompt: self.build_prompt(item, context),
            model: self.options.model.clone(),
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
            timeout: self.options.timeout,
        };

        let reply = tokio::time::timeout(self.options.timeout, self.transport.send(&request))
            .await
            .map_err(|_| JudgeError::Timeout {
                source_id: self.transport.id().to_string(),
                after_ms: self.options.timeout.as_millis() as u64,
            })??;

        debug!(
            source = self.transport.id(),
            latency_ms = reply.latency.as_millis() as u64,
            "inference reply received"
        );

        self.parse_reply(item, &reply.text)
    }

    fn build_prompt(&self, item: &JudgmentItem, context: &str) -> String {
        let axioms: Vec<&str> = Axiom::ALL.iter().map(|a| a.as_str()).collect();
        format!(
            "Judge the following situation.\n\
             Trigger: {trigger}\n\
             Subject: {subject}\n\
             Detail: {detail}\n\
             Context: {context}\n\
             \n\
             Score each axiom from 0 to 100: {axioms}.\n\
             Respond with exactly one JSON object of the shape\n\
             {{\"q_score\": <0-100>, \"verdict\": \"HOWL|WAG|GROWL|BARK\", \
             \"confidence\": <0-1>, \"axiom_scores\": {{\"FIDELITY\": <0-100>, ...}}, \
             \"reason\": \"...\", \"recommendation\": \"...\"}}\n\
             and nothing else.",
            trigger = item.trigger,
            subject = item.subject,
            detail = item.detail,
            context = context,
            axioms = axioms.join(", "),
        )
    }

    fn parse_reply(&self, item: &JudgmentItem, text: &str) -> Result<Judgment> {
        let source_id = self.transport.id().to_string();
        let raw = extract_json_object(text).ok_or_else(|| JudgeError::MalformedResponse {
            source_id: source_id.clone(),
            detail: "no JSON object in reply".to_string(),
        })?;

        let parsed: RawAssessment =
            serde_json::from_str(raw).map_err(|e| JudgeError::MalformedResponse {
                source_id: source_id.clone(),
                detail: e.to_string(),
            })?;

        let q_score = parsed.q_score.clamp(0.0, 100.0);
        let verdict = Verdict::from_q_score(q_score);
        if let Some(claimed) = parsed.verdict.as_deref().and_then(Verdict::parse) {
            if claimed != verdict {
                warn!(
                    source = %source_id,
                    claimed = %claimed,
                    coerced = %verdict,
                    q_score,
                    "verdict disagreed with q-score band, coerced"
                );
            }
        }

        let mut axiom_scores = BTreeMap::new();
        for (name, value) in &parsed.axiom_scores {
            if let Some(axiom) = Axiom::ALL
                .iter()
                .find(|a| a.as_str().eq_ignore_ascii_case(name))
            {
                axiom_scores.insert(*axiom, value.clamp(0.0, 100.0));
            }
        }

        let specificity = self.specificity.estimate(&parsed.reason);
        let bounded = self.bounds.bound(parsed.confidence.clamp(0.0, 1.0), specificity);

        let mut judgment = Judgment::new(item.trigger, &item.subject, self.clock.now_millis());
        judgment.verdict = verdict;
        judgment.reason = parsed.reason;
        judgment.confidence = bounded.confidence;
        judgment.q_score = q_score;
        judgment.axiom_scores = axiom_scores;
        judgment.observation_refs = item.observation_refs.clone();
        judgment.recommendation = parsed.recommendation;
        judgment.source = JudgmentSource::Inference;
        judgment.band = bounded.band;
        Ok(judgment)
    }
}

#[async_trait]
impl SourceJudge for InferenceStrategy {
    fn id(&self) -> &str {
        self.transport.id()
    }

    async fn judge(&self, item: &JudgmentItem, context: &str) -> Result<Judgment> {
        InferenceStrategy::judge(self, item, context).await
    }
}

/// Extracts the first balanced JSON object from free text.
///
/// Backends wrap their answer in prose more often than not; scanning for
/// the first `{` and tracking brace depth (string-aware) recovers the
/// payload without demanding a perfectly clean reply.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phi::MAX_CONFIDENCE;
    use crate::specificity::LexicalSpecificity;
    use crate::transport::InferenceReply;
    use std::sync::Mutex;
    use watchdog_observe::{ManualClock, TriggerKind};

    /// Transport returning canned replies, in order.
    struct CannedTransport {
        id: String,
        replies: Mutex<Vec<Result<String>>>,
    }

    impl CannedTransport {
        fn new(id: &str, replies: Vec<Result<String>>) -> Self {
            Self {
                id: id.to_string(),
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl InferenceTransport for CannedTransport {
        fn id(&self) -> &str {
            &self.id
        }

        async fn send(&self, _request: &InferenceRequest) -> Result<InferenceReply> {
            let mut replies = self.replies.lock().unwrap();
            let next = replies.remove(0);
            next.map(|text| InferenceReply {
                text,
                latency: Duration::from_millis(5),
            })
        }
    }

    fn item() -> JudgmentItem {
        JudgmentItem {
            trigger: TriggerKind::ErrorPattern,
            subject: "Edit:syntax".to_string(),
            detail: "3 errors".to_string(),
            observation_refs: vec![1, 2, 3],
            match_count: 3,
            severity: None,
        }
    }

    fn strategy(transport: CannedTransport) -> InferenceStrategy {
        InferenceStrategy::new(
            Arc::new(transport),
            Arc::new(ManualClock::new(9_000)),
            Arc::new(LexicalSpecificity::new()),
        )
    }

    #[tokio::test]
    async fn test_parses_wrapped_json() {
        let reply = r#"Here is my assessment:
            {"q_score": 45.0, "verdict": "GROWL", "confidence": 0.5,
             "axiom_scores": {"FIDELITY": 40, "VERIFY": 50},
             "reason": "repeated syntax failures", "recommendation": "fix the edit"}
            Hope this helps!"#;
        let strategy = strategy(CannedTransport::new("m1", vec![Ok(reply.to_string())]));

        let judgment = strategy.judge(&item(), "").await.unwrap();
        assert_eq!(judgment.verdict, Verdict::Growl);
        assert_eq!(judgment.source, JudgmentSource::Inference);
        assert_eq!(judgment.axiom_scores.len(), 2);
        assert!(judgment.confidence <= MAX_CONFIDENCE + 1e-9);
    }

    #[tokio::test]
    async fn test_verdict_coerced_to_band() {
        let reply = r#"{"q_score": 90.0, "verdict": "BARK", "confidence": 0.4}"#;
        let strategy = strategy(CannedTransport::new("m1", vec![Ok(reply.to_string())]));
        let judgment = strategy.judge(&item(), "").await.unwrap();
        assert_eq!(judgment.verdict, Verdict::Howl);
    }

    #[tokio::test]
    async fn test_confidence_is_bounded() {
        let reply = r#"{"q_score": 50.0, "confidence": 0.99,
            "reason": "always fails at exactly src/a.rs:1 in 100% of runs"}"#;
        let strategy = strategy(CannedTransport::new("m1", vec![Ok(reply.to_string())]));
        let judgment = strategy.judge(&item(), "").await.unwrap();
        assert!(judgment.confidence <= MAX_CONFIDENCE + 1e-9);
    }

    #[tokio::test]
    async fn test_no_json_is_malformed_response() {
        let strategy = strategy(CannedTransport::new(
            "m1",
            vec![Ok("I cannot answer that.".to_string())],
        ));
        let err = strategy.judge(&item(), "").await.unwrap_err();
        assert!(matches!(err, JudgeError::MalformedResponse { .. }));
        assert!(err.is_abstention());
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        let strategy = strategy(CannedTransport::new(
            "m1",
            vec![Err(JudgeError::Transport {
                source_id: "m1".to_string(),
                detail: "connection refused".to_string(),
            })],
        ));
        let err = strategy.judge(&item(), "").await.unwrap_err();
        assert!(matches!(err, JudgeError::Transport { .. }));
    }

    #[test]
    fn test_extract_json_object_nested() {
        let text = r#"noise {"a": {"b": 1}, "c": "x}y"} trailing"#;
        let extracted = extract_json_object(text).unwrap();
        assert_eq!(extracted, r#"{"a": {"b": 1}, "c": "x}y"}"#);
    }

    #[test]
    fn test_extract_json_object_absent() {
        assert!(extract_json_object("no braces here").is_none());
        assert!(extract_json_object("{unclosed").is_none());
    }
}
