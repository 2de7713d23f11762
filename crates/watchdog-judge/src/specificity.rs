//! Claim specificity estimation.
//!
//! Specificity is a `[0, 1]` measure of how narrow a claim's language is:
//! exact file:line references, percentages, and absolute vocabulary push
//! it up; hedged phrasing pulls it down. It feeds the bounding invariant,
//! which allows less certainty the more specific the claim.
//!
//! The estimator is a trait so domain-specific scoring (code claims vs.
//! prose claims) can be swapped in without touching the invariant.

use regex::Regex;

/// Produces a specificity score for a claim's text.
pub trait SpecificityEstimator: Send + Sync {
    /// Scores `text` in `[0, 1]`; higher is more specific.
    fn estimate(&self, text: &str) -> f64;
}

/// A weighted lexical signal.
#[derive(Debug)]
struct Signal {
    pattern: Regex,
    weight: f64,
}

/// Regex-based lexical specificity estimator.
///
/// Scoring starts from a neutral base; each precision signal that matches
/// adds its weight once, and every hedge occurrence subtracts a fixed
/// penalty (capped). The result is clamped to `[0, 1]`.
pub struct LexicalSpecificity {
    base: f64,
    signals: Vec<Signal>,
    hedges: Regex,
    hedge_penalty: f64,
    max_hedges: usize,
}

impl LexicalSpecificity {
    /// Creates the default estimator.
    pub fn new() -> Self {
        let signals = vec![
            // Exact file:line references.
            Signal {
                pattern: Regex::new(r"[\w./-]+\.[A-Za-z]\w*:\d+").unwrap(),
                weight: 0.20,
            },
            // Percentages.
            Signal {
                pattern: Regex::new(r"\b\d+(?:\.\d+)?%").unwrap(),
                weight: 0.15,
            },
            // Absolute vocabulary.
            Signal {
                pattern: Regex::new(
                    r"(?i)\b(always|never|exactly|every|all|none|must|certainly|definitely)\b",
                )
                .unwrap(),
                weight: 0.15,
            },
            // Bare numerals still narrow a claim, just less.
            Signal {
                pattern: Regex::new(r"\b\d+\b").unwrap(),
                weight: 0.05,
            },
        ];

        Self {
            base: 0.40,
            signals,
            hedges: Regex::new(
                r"(?i)\b(might|maybe|could|possibly|perhaps|roughly|about|around|seems?|likely|unclear|probably)\b",
            )
            .unwrap(),
            hedge_penalty: 0.08,
            max_hedges: 5,
        }
    }
}

impl Default for LexicalSpecificity {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecificityEstimator for LexicalSpecificity {
    fn estimate(&self, text: &str) -> f64 {
        if text.is_empty() {
            return 0.0;
        }

        let mut score = self.base;
        for signal in &self.signals {
            if signal.pattern.is_match(text) {
                score += signal.weight;
            }
        }

        let hedge_count = self.hedges.find_iter(text).count().min(self.max_hedges);
        score -= hedge_count as f64 * self.hedge_penalty;

        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_unspecific() {
        let estimator = LexicalSpecificity::new();
        assert_eq!(estimator.estimate(""), 0.0);
    }

    #[test]
    fn test_file_line_reference_raises_score() {
        let estimator = LexicalSpecificity::new();
        let vague = estimator.estimate("something is wrong somewhere");
        let precise = estimator.estimate("null deref at src/parser.rs:142");
        assert!(precise > vague);
    }

    #[test]
    fn test_percentages_and_absolutes_raise_score() {
        let estimator = LexicalSpecificity::new();
        let score = estimator.estimate("exactly 73% of requests always fail");
        assert!(score > 0.6);
    }

    #[test]
    fn test_hedges_lower_score() {
        let estimator = LexicalSpecificity::new();
        let hedged =
            estimator.estimate("this might possibly be roughly related, perhaps, maybe");
        let plain = estimator.estimate("this is related");
        assert!(hedged < plain);
    }

    #[test]
    fn test_score_stays_in_range() {
        let estimator = LexicalSpecificity::new();
        let maxed = estimator.estimate(
            "always fails at exactly src/a.rs:1 in 100% of 500 runs, never passes, all of them",
        );
        assert!(maxed <= 1.0);

        let floored = estimator.estimate(
            "might maybe could possibly perhaps seems likely unclear roughly about probably",
        );
        assert!(floored >= 0.0);
    }
}
