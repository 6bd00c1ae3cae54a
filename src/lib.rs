//! # derma-vision
//!
//! A dermatological image analysis library built on the candle tensor
//! framework.
//!
//! The library takes a skin lesion photograph and produces:
//!
//! - a coarse 5-way category distribution (fungal, inflammatory, normal,
//!   malignant, benign) and a fine-grained 10-way disease distribution,
//! - an attention heatmap overlay locating the regions the classifier
//!   attended to, and
//! - a structured report, optionally co-written by an external multimodal
//!   model.
//!
//! Checkpoints are accepted in several serialization shapes (metadata-tagged
//! safetensors, wrapper-prefixed module archives, and raw state
//! dictionaries) and reconstructed against a registry of known
//! architectures. The externally-facing operations degrade instead of
//! failing: a missing model yields a synthetic analysis, a failed activation
//! map yields a placeholder overlay.
//!
//! ## Example
//!
//! ```no_run
//! use derma_vision::core::config::AnalyzerConfig;
//! use derma_vision::pipeline::Analyzer;
//!
//! # fn main() -> Result<(), derma_vision::core::errors::DermaError> {
//! let analyzer = Analyzer::new(AnalyzerConfig::new("models/dermanet.safetensors"))?;
//! let image = std::fs::read("lesion.jpg")?;
//!
//! let analysis = analyzer.analyze(&image);
//! println!("confidence {:.2}: {}", analysis.confidence, analysis.description);
//!
//! let overlay = analyzer.heatmap(&image);
//! std::fs::write("lesion_heatmap.jpg", overlay.bytes)?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod inference;
pub mod models;
pub mod pipeline;
pub mod processors;

/// Commonly used types, re-exported for convenient glob import.
pub mod prelude {
    pub use crate::core::config::{AnalyzerConfig, ConfigLoader, OverlayConfig};
    pub use crate::core::errors::{DermaError, DermaResult};
    pub use crate::domain::{AnalysisResult, Cam, ProbabilityVector, Report, Tier1Label, Tier2Label};
    pub use crate::inference::Prediction;
    pub use crate::models::{LesionModel, ModelCache};
    pub use crate::pipeline::{Analyzer, PromptPart, VisionCollaborator};
    pub use crate::processors::{HeatmapCompositor, HeatmapImage, ImagePreprocessor};
}
