//! The confidence-bounding invariant.
//!
//! Two independent limits apply to every judgment's confidence, and the
//! tighter one wins:
//!
//! - a hard cap at [`MAX_CONFIDENCE`] regardless of anything else, and
//! - a specificity-linked cap `CERTAINTY_PRODUCT_LIMIT / specificity`:
//!   the narrower the claim, the less certainty may be asserted about it.
//!
//! Specificity is floored at [`SPECIFICITY_FLOOR`] inside the cap so no
//! claim — however vague — ever reaches zero residual uncertainty.
//!
//! Every strategy applies [`ConfidenceBounds::bound`] before a judgment
//! is final. This is the one invariant that is never bypassed.

use serde::{Deserialize, Serialize};

use crate::phi::{
    CERTAINTY_PRODUCT_LIMIT, HOWL_MIN, MAX_CONFIDENCE, PHI_INV, PHI_INV_2, SPECIFICITY_FLOOR,
};

/// Classification of how much uncertainty remains after bounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UncertaintyBand {
    /// Close to the certainty product limit.
    Precise,
    /// Comfortable certainty.
    Confident,
    /// Substantial residual uncertainty.
    Uncertain,
    /// Mostly uncertainty.
    Speculative,
}

impl std::fmt::Display for UncertaintyBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Precise => "PRECISE",
            Self::Confident => "CONFIDENT",
            Self::Uncertain => "UNCERTAIN",
            Self::Speculative => "SPECULATIVE",
        };
        write!(f, "{}", name)
    }
}

/// Result of applying the bounding invariant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundOutcome {
    /// The bounded confidence.
    pub confidence: f64,
    /// Whether any limit actually reduced the desired confidence.
    pub reduced: bool,
    /// How much was taken off.
    pub reduction: f64,
    /// Residual-uncertainty classification.
    pub band: UncertaintyBand,
}

/// The two confidence limits and the specificity floor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceBounds {
    /// Absolute ceiling on confidence.
    pub hard_cap: f64,
    /// Cap on `confidence × specificity`.
    pub product_limit: f64,
    /// Floor applied to specificity inside the product cap.
    pub specificity_floor: f64,
}

impl ConfidenceBounds {
    /// The φ-derived defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hard_cap: MAX_CONFIDENCE,
            product_limit: CERTAINTY_PRODUCT_LIMIT,
            specificity_floor: SPECIFICITY_FLOOR,
        }
    }

    /// Applies both limits to a desired confidence.
    ///
    /// `specificity` is a `[0, 1]` measure of how narrow the underlying
    /// claim is; out-of-range inputs are clamped.
    pub fn bound(&self, desired: f64, specificity: f64) -> BoundOutcome {
        let desired = desired.max(0.0);
        let specificity = specificity.clamp(0.0, 1.0);

        let specificity_cap = self.product_limit / specificity.max(self.specificity_floor);
        let confidence = desired.min(self.hard_cap).min(specificity_cap);

        let residual =
            (1.0 - confidence * specificity / self.product_limit).clamp(0.0, 1.0);
        let band = if residual < PHI_INV_2 {
            UncertaintyBand::Precise
        } else if residual < PHI_INV {
            UncertaintyBand::Confident
        } else if residual < HOWL_MIN / 100.0 {
            UncertaintyBand::Uncertain
        } else {
            UncertaintyBand::Speculative
        };

        BoundOutcome {
            confidence,
            reduced: confidence < desired,
            reduction: desired - confidence,
            band,
        }
    }
}

impl Default for ConfidenceBounds {
    fn default() -> Self {
        Self::new()
    }
}
