//! Analysis and report result types.

use crate::core::errors::DermaError;
use crate::domain::labels::{Tier1Label, Tier2Label};
use crate::domain::probability::{clamp_confidence, ProbabilityVector};
use serde::{Deserialize, Serialize};

/// A complete per-request analysis: both tier distributions, an overall
/// confidence, a free-text description, and an ordered recommendation list.
///
/// Consumers always receive a well-formed value: every production path
/// either succeeds or substitutes the synthetic fallback analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Coarse 5-way category distribution.
    pub tier1: ProbabilityVector,
    /// Fine-grained 10-way disease distribution.
    pub tier2: ProbabilityVector,
    /// Overall confidence in `[0, 1]`.
    pub confidence: f32,
    /// Human-readable description of the findings.
    pub description: String,
    /// Ordered recommendations.
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    /// Builds an analysis from the class probabilities of a 10-class lesion
    /// classifier.
    ///
    /// Class index `i` maps to `Tier2Label::ALL[i]`; the tier-1 distribution
    /// is the aggregation of tier-2 mass by coarse category (the `normal`
    /// category receives no mass from the classifier). Both vectors are
    /// normalized onto the simplex and the confidence is the clamped top
    /// class probability.
    ///
    /// # Errors
    ///
    /// Returns [`DermaError::InvalidInput`] when the score vector does not
    /// have exactly 10 components; such models cannot be mapped onto the
    /// tier-2 label set and the caller should degrade to the fallback
    /// analysis.
    pub fn from_class_scores(scores: &[f32]) -> Result<Self, DermaError> {
        if scores.len() != Tier2Label::ALL.len() {
            return Err(DermaError::invalid_input(format!(
                "expected {} class scores for the tier-2 label set, got {}",
                Tier2Label::ALL.len(),
                scores.len()
            )));
        }

        let tier2 = ProbabilityVector::from_entries(
            Tier2Label::ALL
                .iter()
                .zip(scores)
                .map(|(label, &score)| (label.as_str().to_string(), score))
                .collect(),
        )
        .normalized();

        let mut tier1_mass = [0.0f32; 5];
        for (label, &score) in Tier2Label::ALL.iter().zip(scores) {
            let slot = Tier1Label::ALL
                .iter()
                .position(|t| *t == label.tier1())
                .unwrap_or(0);
            tier1_mass[slot] += score.max(0.0);
        }
        let tier1 = ProbabilityVector::from_entries(
            Tier1Label::ALL
                .iter()
                .zip(tier1_mass)
                .map(|(label, mass)| (label.as_str().to_string(), mass))
                .collect(),
        )
        .normalized();

        let (top_label, top_prob) = Tier2Label::ALL
            .iter()
            .zip(tier2.iter().map(|(_, p)| p))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(label, prob)| (*label, prob))
            .unwrap_or((Tier2Label::Melanoma, 0.0));

        Ok(Self {
            confidence: clamp_confidence(top_prob),
            description: format!(
                "Classifier analysis complete. Highest-probability finding: {} ({:.1}%).",
                top_label.as_str(),
                top_prob * 100.0
            ),
            recommendations: vec![
                "Consult a dermatologist for professional evaluation.".to_string(),
                "Monitor the lesion for changes in size, shape, or color.".to_string(),
            ],
            tier1,
            tier2,
        })
    }
}

/// A structured report produced by the report assembler.
///
/// When the report comes from a vision collaborator, every field is
/// optional in the reply; missing fields default. The locally synthesized
/// report always embeds both tier vectors and a confidence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    /// Report title.
    #[serde(default)]
    pub title: String,
    /// Summary paragraph.
    #[serde(default)]
    pub summary: String,
    /// Findings paragraph.
    #[serde(default)]
    pub findings: String,
    /// Ordered recommendations.
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Embedded tier-1 distribution, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier1: Option<ProbabilityVector>,
    /// Embedded tier-2 distribution, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier2: Option<ProbabilityVector>,
    /// Overall confidence, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Reference to the composited heatmap (for example a data URL or an
    /// object key), when one was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmap: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::probability::SIMPLEX_EPSILON;

    #[test]
    fn class_scores_map_onto_both_tiers() {
        let mut scores = [0.0f32; 10];
        scores[0] = 0.6; // melanoma -> malignant
        scores[8] = 0.4; // tinea -> fungal
        let analysis = AnalysisResult::from_class_scores(&scores).unwrap();

        assert!((analysis.tier2.total() - 1.0).abs() <= SIMPLEX_EPSILON);
        assert!((analysis.tier1.total() - 1.0).abs() <= SIMPLEX_EPSILON);
        assert!((analysis.tier2.get("melanoma").unwrap() - 0.6).abs() <= 1e-5);
        assert!((analysis.tier1.get("malignant").unwrap() - 0.6).abs() <= 1e-5);
        assert!((analysis.tier1.get("fungal").unwrap() - 0.4).abs() <= 1e-5);
        assert_eq!(analysis.tier1.get("normal"), Some(0.0));
        assert!((analysis.confidence - 0.6).abs() <= 1e-5);
    }

    #[test]
    fn rejects_non_tier2_class_count() {
        assert!(AnalysisResult::from_class_scores(&[0.5, 0.5]).is_err());
    }

    #[test]
    fn report_deserializes_with_missing_fields() {
        let report: Report = serde_json::from_str(r#"{"title":"X","summary":"Y"}"#).unwrap();
        assert_eq!(report.title, "X");
        assert_eq!(report.summary, "Y");
        assert!(report.findings.is_empty());
        assert!(report.tier1.is_none());
        assert!(report.heatmap.is_none());
    }
}
