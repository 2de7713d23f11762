//! Verdict bands for judgment results.
//!
//! Every judgment lands in one of four severity bands mapped from its
//! q-score. HOWL is the most severe-positive signal (exceptional or an
//! alarm worth howling about), BARK the most negative.

use serde::{Deserialize, Serialize};

use crate::phi::{GROWL_MIN, HOWL_MIN, WAG_MIN};

/// The four verdict bands, ordered by severity: HOWL > WAG > GROWL > BARK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Exceptional — q-score ≥ 82.
    Howl,
    /// Good — q-score in [61.8, 82).
    Wag,
    /// Needs work — q-score in [38.2, 61.8).
    Growl,
    /// Critical — q-score below 38.2.
    Bark,
}

impl Verdict {
    /// Maps a q-score in `[0, 100]` to its band.
    pub fn from_q_score(q_score: f64) -> Self {
        if q_score >= HOWL_MIN {
            Self::Howl
        } else if q_score >= WAG_MIN {
            Self::Wag
        } else if q_score >= GROWL_MIN {
            Self::Growl
        } else {
            Self::Bark
        }
    }

    /// Severity rank; higher means more severe-positive.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Howl => 3,
            Self::Wag => 2,
            Self::Growl => 1,
            Self::Bark => 0,
        }
    }

    /// A representative q-score at the center of this band, used when a
    /// band is chosen before a score exists.
    pub fn band_midpoint(&self) -> f64 {
        match self {
            Self::Howl => (HOWL_MIN + 100.0) / 2.0,
            Self::Wag => (WAG_MIN + HOWL_MIN) / 2.0,
            Self::Growl => (GROWL_MIN + WAG_MIN) / 2.0,
            Self::Bark => GROWL_MIN / 2.0,
        }
    }

    /// Stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Howl => "HOWL",
            Self::Wag => "WAG",
            Self::Growl => "GROWL",
            Self::Bark => "BARK",
        }
    }

    /// Parses the string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HOWL" => Some(Self::Howl),
            "WAG" => Some(Self::Wag),
            "GROWL" => Some(Self::Growl),
            "BARK" => Some(Self::Bark),
            _ => None,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_mapping() {
        assert_eq!(Verdict::from_q_score(95.0), Verdict::Howl);
        assert_eq!(Verdict::from_q_score(82.0), Verdict::Howl);
        assert_eq!(Verdict::from_q_score(70.0), Verdict::Wag);
        assert_eq!(Verdict::from_q_score(61.8034), Verdict::Wag);
        assert_eq!(Verdict::from_q_score(50.0), Verdict::Growl);
        assert_eq!(Verdict::from_q_score(38.1967), Verdict::Growl);
        assert_eq!(Verdict::from_q_score(20.0), Verdict::Bark);
        assert_eq!(Verdict::from_q_score(0.0), Verdict::Bark);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Verdict::Howl.severity() > Verdict::Wag.severity());
        assert!(Verdict::Wag.severity() > Verdict::Growl.severity());
        assert!(Verdict::Growl.severity() > Verdict::Bark.severity());
    }

    #[test]
    fn test_band_midpoints_round_trip() {
        for verdict in [Verdict::Howl, Verdict::Wag, Verdict::Growl, Verdict::Bark] {
            assert_eq!(Verdict::from_q_score(verdict.band_midpoint()), verdict);
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(Verdict::parse("HOWL"), Some(Verdict::Howl));
        assert_eq!(Verdict::parse(" growl "), Some(Verdict::Growl));
        assert_eq!(Verdict::parse("purr"), None);
    }

    #[test]
    fn test_serialization_uses_wire_names() {
        let json = serde_json::to_string(&Verdict::Wag).unwrap();
        assert_eq!(json, "\"WAG\"");
    }
}
