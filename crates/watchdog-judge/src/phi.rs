//! Golden-ratio constant family.
//!
//! Every judgment tunable in this workspace derives from φ. The family is
//! defined once here; nothing else hardcodes these values.
//!
//! | Constant | Value | Role |
//! |----------|-------|------|
//! | `MAX_CONFIDENCE` | φ⁻¹ ≈ 0.618 | hard cap on any asserted confidence |
//! | `CONSENSUS_THRESHOLD` | φ⁻¹ ≈ 0.618 | agreement ratio needed for consensus |
//! | `CERTAINTY_PRODUCT_LIMIT` | φ⁻² ≈ 0.382 | cap on confidence × specificity |
//! | `SPECIFICITY_FLOOR` | φ⁻³ ≈ 0.236 | minimum specificity used in the cap |
//! | `UNIT_CONFIDENCE` | φ⁻³ ≈ 0.236 | static confidence per matched observation |
//! | `HOWL_MIN` / `WAG_MIN` / `GROWL_MIN` | 82 / 61.8 / 38.2 | verdict bands |

/// The golden ratio.
pub const PHI: f64 = 1.618033988749895;

/// φ⁻¹ = φ − 1.
pub const PHI_INV: f64 = 0.618033988749895;

/// φ⁻² = 2 − φ.
pub const PHI_INV_2: f64 = 0.381966011250105;

/// φ⁻³.
pub const PHI_INV_3: f64 = 0.236067977499790;

/// No judgment may assert confidence above this ceiling.
pub const MAX_CONFIDENCE: f64 = PHI_INV;

/// Minimum agreement ratio for consensus to be declared reached.
pub const CONSENSUS_THRESHOLD: f64 = PHI_INV;

/// Upper bound on `confidence × specificity`.
pub const CERTAINTY_PRODUCT_LIMIT: f64 = PHI_INV_2;

/// Floor applied to specificity when computing the product cap, so a
/// maximally vague claim still carries residual uncertainty.
pub const SPECIFICITY_FLOOR: f64 = PHI_INV_3;

/// Confidence contributed by each matched observation in static scoring.
pub const UNIT_CONFIDENCE: f64 = PHI_INV_3;

/// Q-score floor of the HOWL band.
pub const HOWL_MIN: f64 = 82.0;

/// Q-score floor of the WAG band (φ⁻¹ × 100).
pub const WAG_MIN: f64 = PHI_INV * 100.0;

/// Q-score floor of the GROWL band (φ⁻² × 100). Below it is BARK.
pub const GROWL_MIN: f64 = PHI_INV_2 * 100.0;

/// Geometric mean over `[0, 100]` scores.
///
/// More conservative than the arithmetic mean: a single zero collapses
/// the result to zero, so total failure on one axiom reads as failure
/// overall. Empty input yields zero.
pub fn geometric_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if values.iter().any(|v| *v <= 0.0) {
        return 0.0;
    }
    let log_sum: f64 = values.iter().map(|v| v.ln()).sum();
    (log_sum / values.len() as f64).exp()
}
