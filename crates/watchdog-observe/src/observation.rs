//! Observation model.
//!
//! An observation is one discrete behavioral event seen by the pipeline:
//! a failed tool call, a completed task, a burst of edits to one file, a
//! security signal, or an anomaly reported by an upstream detector.
//! Observations are immutable once recorded.

use serde::{Deserialize, Serialize};

/// The type of a behavioral observation.
///
/// The variant determines which trigger rule (if any) the observation can
/// feed. `Pattern` observations carry context only and never trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    /// A failed operation.
    Error,
    /// A successfully completed operation.
    Success,
    /// A change to a tracked resource.
    CodeChange,
    /// A security-relevant signal.
    Security,
    /// A recurring pattern reported by an upstream detector.
    Pattern,
    /// A deviation from expected behavior.
    Anomaly,
}

impl std::fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Success => "success",
            Self::CodeChange => "code_change",
            Self::Security => "security",
            Self::Pattern => "pattern",
            Self::Anomaly => "anomaly",
        };
        write!(f, "{}", name)
    }
}

/// Severity attached to security observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
    /// Immediate alarm.
    Critical,
}

/// A single immutable behavioral observation.
///
/// `id` and `timestamp_ms` are zero on a freshly built observation and are
/// assigned by [`ObservationStore::record`](crate::ObservationStore::record).
///
/// # Example
///
/// ```rust
/// use watchdog_observe::{Observation, ObservationKind};
///
/// let obs = Observation::new(ObservationKind::Error, "Edit:syntax")
///     .with_target("src/main.rs");
/// assert_eq!(obs.signature, "Edit:syntax");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Store-assigned monotonic identifier.
    #[serde(default)]
    pub id: u64,
    /// What kind of event this is.
    pub kind: ObservationKind,
    /// Groups related observations (e.g. `"Edit:syntax"`).
    pub signature: String,
    /// Resource the observation concerns, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Severity, for security observations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Free-form context carried with the observation.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
    /// Store-assigned record time in milliseconds since the epoch.
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl Observation {
    /// Builds an unrecorded observation.
    pub fn new(kind: ObservationKind, signature: impl Into<String>) -> Self {
        Self {
            id: 0,
            kind,
            signature: signature.into(),
            target: None,
            severity: None,
            payload: serde_json::Value::Null,
            timestamp_ms: 0,
        }
    }

    /// Attaches the resource this observation concerns.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Attaches a severity level.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Attaches free-form payload data.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
