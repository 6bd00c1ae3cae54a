//! Report assembly.
//!
//! A report is preferably produced by a vision collaborator (an external
//! multimodal model given the analysis, the patient-described symptoms, and
//! the photograph). Collaborator replies are free text that usually embeds a
//! JSON object; the object is located by a balanced-brace scan rather than a
//! pattern match, so nested objects survive extraction. When no collaborator
//! is configured, or its reply cannot be parsed, a report is synthesized
//! locally from the analysis alone.

use crate::core::errors::DermaError;
use crate::domain::{
    clamp_confidence, AnalysisResult, ProbabilityVector, Report, Tier1Label, Tier2Label,
};

/// One part of a multimodal prompt.
#[derive(Debug)]
pub enum PromptPart<'a> {
    /// A text segment.
    Text(String),
    /// An encoded image with its MIME type.
    Image {
        /// Encoded image bytes.
        bytes: &'a [u8],
        /// MIME type of `bytes`.
        mime: &'a str,
    },
}

/// An external multimodal model that turns a prompt into a free-text reply.
///
/// Implementations own transport, authentication, and retries; the pipeline
/// only sees the reply text.
pub trait VisionCollaborator: Send + Sync {
    /// Generates a reply for the given prompt parts.
    fn generate(&self, parts: &[PromptPart<'_>]) -> Result<String, DermaError>;
}

/// Assembles a report from the analysis, optionally consulting
/// `collaborator`. Never fails: any collaborator or parse failure degrades
/// to the locally synthesized report.
pub fn assemble_report(
    collaborator: Option<&dyn VisionCollaborator>,
    analysis: &AnalysisResult,
    symptoms: &str,
    image: Option<(&[u8], &str)>,
) -> Report {
    let Some(collaborator) = collaborator else {
        return synthesize_report(analysis, symptoms);
    };

    let mut parts = vec![PromptPart::Text(report_prompt(analysis, symptoms))];
    if let Some((bytes, mime)) = image {
        parts.push(PromptPart::Image { bytes, mime });
    }

    match collaborator.generate(&parts) {
        Ok(reply) => match parse_report_reply(&reply) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "collaborator reply unusable, synthesizing report");
                synthesize_report(analysis, symptoms)
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "collaborator request failed, synthesizing report");
            synthesize_report(analysis, symptoms)
        }
    }
}

fn report_prompt(analysis: &AnalysisResult, symptoms: &str) -> String {
    let analysis_json =
        serde_json::to_string(analysis).unwrap_or_else(|_| "{}".to_string());
    format!(
        "You are assisting with a dermatological screening report. \
         Classifier analysis: {analysis_json}. Reported symptoms: {symptoms}. \
         Reply with a single JSON object with fields title, summary, findings, \
         and recommendations (an array of strings)."
    )
}

/// Parses a collaborator reply into a [`Report`].
pub fn parse_report_reply(reply: &str) -> Result<Report, DermaError> {
    let object = extract_json_object(reply)
        .ok_or_else(|| DermaError::report_parse("reply contains no JSON object"))?;
    serde_json::from_str(object)
        .map_err(|e| DermaError::report_parse(format!("reply JSON malformed: {e}")))
}

/// Extracts the first balanced top-level JSON object from `text`.
///
/// Tracks string literals and escape sequences so braces inside strings do
/// not affect the depth count.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
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

/// Synthesizes a report locally from the analysis, used whenever no
/// collaborator reply is available.
pub fn synthesize_report(analysis: &AnalysisResult, symptoms: &str) -> Report {
    let summary = if symptoms.trim().is_empty() {
        "Automated screening of the submitted skin photograph.".to_string()
    } else {
        format!(
            "Automated screening of the submitted skin photograph. Reported symptoms: {}.",
            symptoms.trim()
        )
    };

    let mut categories: Vec<(&str, f32)> = analysis.tier1.iter().collect();
    categories.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let findings = categories
        .iter()
        .map(|(label, prob)| format!("{label}: {:.1}%", prob * 100.0))
        .collect::<Vec<_>>()
        .join(", ");

    Report {
        title: "Dermatological Analysis Report".to_string(),
        summary,
        findings,
        recommendations: vec![
            "Consult a dermatologist for a professional evaluation.".to_string(),
            "Monitor the area for changes and photograph it periodically.".to_string(),
            "Seek prompt care if the lesion grows, bleeds, or changes color.".to_string(),
        ],
        tier1: Some(analysis.tier1.clone()),
        tier2: Some(analysis.tier2.clone()),
        confidence: Some(analysis.confidence),
        heatmap: None,
    }
}

/// Recovers an [`AnalysisResult`] from a collaborator reply that embeds tier
/// probability maps.
///
/// Labels are read in their fixed contract order with absent entries
/// defaulting to zero, then each tier is normalized. The confidence defaults
/// to 0.7 when the reply omits it.
pub fn analysis_from_reply(reply: &str) -> Result<AnalysisResult, DermaError> {
    let object = extract_json_object(reply)
        .ok_or_else(|| DermaError::report_parse("reply contains no JSON object"))?;
    let value: serde_json::Value = serde_json::from_str(object)
        .map_err(|e| DermaError::report_parse(format!("reply JSON malformed: {e}")))?;

    let tier1 = ProbabilityVector::from_entries(
        Tier1Label::ALL
            .iter()
            .map(|label| (label.as_str().to_string(), field_prob(&value, "tier1", label.as_str())))
            .collect(),
    )
    .normalized();
    let tier2 = ProbabilityVector::from_entries(
        Tier2Label::ALL
            .iter()
            .map(|label| (label.as_str().to_string(), field_prob(&value, "tier2", label.as_str())))
            .collect(),
    )
    .normalized();

    let confidence = clamp_confidence(
        value
            .get("confidence")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.7) as f32,
    );
    let description = value
        .get("description")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("Analysis recovered from collaborator reply")
        .to_string();
    let recommendations = value
        .get("recommendations")
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(AnalysisResult {
        tier1,
        tier2,
        confidence,
        description,
        recommendations,
    })
}

fn field_prob(value: &serde_json::Value, tier: &str, label: &str) -> f32 {
    value
        .get(tier)
        .and_then(|t| t.get(label))
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(0.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fallback::fallback_analysis;

    struct CannedCollaborator(&'static str);

    impl VisionCollaborator for CannedCollaborator {
        fn generate(&self, _parts: &[PromptPart<'_>]) -> Result<String, DermaError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingCollaborator;

    impl VisionCollaborator for FailingCollaborator {
        fn generate(&self, _parts: &[PromptPart<'_>]) -> Result<String, DermaError> {
            Err(DermaError::report_parse("unreachable endpoint"))
        }
    }

    #[test]
    fn extraction_handles_nested_objects_and_strings() {
        let text = r#"Sure! Here it is: {"title": "ok", "nested": {"brace": "}"}} trailing"#;
        let object = extract_json_object(text).unwrap();
        assert_eq!(object, r#"{"title": "ok", "nested": {"brace": "}"}}"#);
    }

    #[test]
    fn extraction_returns_none_for_unbalanced_text() {
        assert!(extract_json_object("no braces here").is_none());
        assert!(extract_json_object(r#"{"open": true"#).is_none());
    }

    #[test]
    fn collaborator_reply_becomes_a_report() {
        let collaborator = CannedCollaborator(
            r#"Here you go: {"title": "Screening", "summary": "s", "recommendations": ["a"]}"#,
        );
        let analysis = fallback_analysis();
        let report = assemble_report(Some(&collaborator), &analysis, "itching", None);
        assert_eq!(report.title, "Screening");
        assert_eq!(report.recommendations, vec!["a".to_string()]);
    }

    #[test]
    fn failing_collaborator_degrades_to_synthesis() {
        let analysis = fallback_analysis();
        let report = assemble_report(Some(&FailingCollaborator), &analysis, "itching", None);
        assert_eq!(report.title, "Dermatological Analysis Report");
        assert_eq!(report.recommendations.len(), 3);
        assert!(report.summary.contains("itching"));
        assert!(report.tier2.is_some());
    }

    #[test]
    fn reply_analysis_normalizes_and_defaults() {
        let reply = r#"{"tier1": {"malignant": 0.6, "benign": 0.2}, "tier2": {"melanoma": 1.0}}"#;
        let analysis = analysis_from_reply(reply).unwrap();
        assert!(analysis.tier1.is_simplex());
        assert!((analysis.tier2.get("melanoma").unwrap() - 1.0).abs() < 1e-6);
        assert!((analysis.confidence - 0.7).abs() < 1e-6);
        assert_eq!(analysis.tier1.len(), 5);
    }

    #[test]
    fn reply_without_json_is_an_error() {
        assert!(analysis_from_reply("I cannot help with that").is_err());
    }
}
