//! Domain types: diagnostic labels, probability vectors, activation maps,
//! and the analysis/report result shapes.

pub mod cam;
pub mod labels;
pub mod probability;
pub mod result;

pub use cam::Cam;
pub use labels::{Tier1Label, Tier2Label};
pub use probability::{clamp_confidence, ProbabilityVector, SIMPLEX_EPSILON};
pub use result::{AnalysisResult, Report};
