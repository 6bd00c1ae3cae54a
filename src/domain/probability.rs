//! Ordered probability vectors and the simplex invariant.
//!
//! A [`ProbabilityVector`] is an ordered label-to-probability mapping. After
//! [`ProbabilityVector::normalize`] the components are expected to be
//! non-negative and sum to 1 within 1e-6. An all-zero (or non-positive-total)
//! input is the documented degenerate case: normalization leaves it
//! unchanged rather than dividing by zero.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tolerance used when asserting the simplex invariant.
pub const SIMPLEX_EPSILON: f32 = 1e-6;

/// An ordered label-to-probability mapping.
///
/// Serializes as a JSON/TOML map that preserves entry order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbabilityVector {
    entries: Vec<(String, f32)>,
}

impl ProbabilityVector {
    /// Creates a vector from ordered entries.
    pub fn from_entries(entries: Vec<(String, f32)>) -> Self {
        Self { entries }
    }

    /// Creates a vector from ordered static labels and values.
    pub fn from_labels<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, f32)>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(label, value)| (label.to_string(), value))
                .collect(),
        }
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the vector has no components.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a component by label.
    pub fn get(&self, label: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| *value)
    }

    /// Iterates components in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Sum of all components.
    pub fn total(&self) -> f32 {
        self.entries.iter().map(|(_, value)| value).sum()
    }

    /// Rescales components to sum to 1.
    ///
    /// If the total is not positive the values are left unchanged (the
    /// divisor is treated as 1). That is the documented degenerate case for
    /// all-zero inputs, not a failure. Negative components are diluted by
    /// the rescale rather than rejected; they are logged because they
    /// indicate a misbehaving upstream producer.
    pub fn normalize(&mut self) {
        if self.entries.iter().any(|(_, value)| *value < 0.0) {
            tracing::warn!(
                "probability vector contains negative components; they will be diluted, not rejected"
            );
        }
        let total = self.total();
        if total <= 0.0 {
            return;
        }
        for (_, value) in &mut self.entries {
            *value /= total;
        }
    }

    /// Consuming variant of [`ProbabilityVector::normalize`].
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Whether the components are non-negative and sum to 1 within
    /// [`SIMPLEX_EPSILON`].
    pub fn is_simplex(&self) -> bool {
        self.entries.iter().all(|(_, value)| *value >= 0.0)
            && (self.total() - 1.0).abs() <= SIMPLEX_EPSILON
    }
}

impl Serialize for ProbabilityVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, value) in &self.entries {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

struct ProbabilityVectorVisitor;

impl<'de> Visitor<'de> for ProbabilityVectorVisitor {
    type Value = ProbabilityVector;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a map of label to probability")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((label, value)) = access.next_entry::<String, f32>()? {
            entries.push((label, value));
        }
        Ok(ProbabilityVector { entries })
    }
}

impl<'de> Deserialize<'de> for ProbabilityVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ProbabilityVectorVisitor)
    }
}

/// Clamps a confidence score into `[0, 1]`.
///
/// NaN is treated as no confidence at all.
pub fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_sums_to_one() {
        let v = ProbabilityVector::from_labels([("a", 2.0), ("b", 3.0), ("c", 5.0)]).normalized();
        assert!((v.total() - 1.0).abs() <= SIMPLEX_EPSILON);
        assert!(v.is_simplex());
        assert!((v.get("c").unwrap() - 0.5).abs() <= SIMPLEX_EPSILON);
    }

    #[test]
    fn normalize_leaves_zero_total_unchanged() {
        let v = ProbabilityVector::from_labels([("a", 0.0), ("b", 0.0)]).normalized();
        assert_eq!(v.get("a"), Some(0.0));
        assert_eq!(v.get("b"), Some(0.0));
        assert!(!v.is_simplex());
    }

    #[test]
    fn normalize_dilutes_negative_components() {
        let v = ProbabilityVector::from_labels([("a", -1.0), ("b", 3.0)]).normalized();
        assert!((v.total() - 1.0).abs() <= SIMPLEX_EPSILON);
        assert!(v.get("a").unwrap() < 0.0);
    }

    #[test]
    fn clamp_confidence_bounds() {
        assert_eq!(clamp_confidence(-0.5), 0.0);
        assert_eq!(clamp_confidence(1.5), 1.0);
        assert_eq!(clamp_confidence(0.75), 0.75);
        assert_eq!(clamp_confidence(f32::NAN), 0.0);
        assert_eq!(clamp_confidence(f32::INFINITY), 1.0);
        assert_eq!(clamp_confidence(f32::NEG_INFINITY), 0.0);
    }

    #[test]
    fn serde_round_trip_preserves_order() {
        let v = ProbabilityVector::from_labels([("zeta", 0.25), ("alpha", 0.75)]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"zeta":0.25,"alpha":0.75}"#);
        let back: ProbabilityVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
