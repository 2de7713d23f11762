//! The five scoring axioms.
//!
//! Every judgment carries a per-axiom sub-score in `[0, 100]`; the
//! q-score aggregates them (geometric mean for static scoring, arithmetic
//! cross-vote mean for consensus).

use serde::{Deserialize, Serialize};

/// One scoring dimension.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Axiom {
    /// Does the subject do what it claims to do?
    Fidelity,
    /// Is it proportionate — no over- or under-reaction?
    Phi,
    /// Can the claim be checked against evidence?
    Verify,
    /// Does it respect the conventions of its surroundings?
    Culture,
    /// Is effort spent where it matters?
    Burn,
}

impl Axiom {
    /// Every axiom, in stable order.
    pub const ALL: [Axiom; 5] = [
        Axiom::Fidelity,
        Axiom::Phi,
        Axiom::Verify,
        Axiom::Culture,
        Axiom::Burn,
    ];

    /// Stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fidelity => "FIDELITY",
            Self::Phi => "PHI",
            Self::Verify => "VERIFY",
            Self::Culture => "CULTURE",
            Self::Burn => "BURN",
        }
    }
}

impl std::fmt::Display for Axiom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_axioms_distinct() {
        let mut names: Vec<&str> = Axiom::ALL.iter().map(|a| a.as_str()).collect();
        names.dedup();
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&Axiom::Fidelity).unwrap();
        assert_eq!(json, "\"FIDELITY\"");
    }
}
