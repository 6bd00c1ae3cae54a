//! Analysis pipeline orchestration.

pub mod fallback;
pub mod report;

pub use fallback::{fallback_analysis, FALLBACK_CONFIDENCE};
pub use report::{
    analysis_from_reply, assemble_report, extract_json_object, synthesize_report, PromptPart,
    VisionCollaborator,
};

use crate::core::config::AnalyzerConfig;
use crate::core::errors::DermaError;
use crate::domain::{AnalysisResult, Report};
use crate::inference::{class_probabilities, explain, top_k, Prediction};
use crate::models::ModelCache;
use crate::processors::{HeatmapCompositor, HeatmapImage, ImagePreprocessor};
use candle_core::Device;
use std::sync::Arc;

/// The end-to-end lesion analysis pipeline.
///
/// Owns preprocessing, the model cache, inference, explainability, and
/// report assembly. The externally-facing operations ([`analyze`] and
/// [`heatmap`]) never fail; each internal failure degrades to the next
/// rendering or analysis path down.
///
/// [`analyze`]: Analyzer::analyze
/// [`heatmap`]: Analyzer::heatmap
pub struct Analyzer {
    config: AnalyzerConfig,
    cache: Arc<ModelCache>,
    preprocessor: ImagePreprocessor,
    compositor: HeatmapCompositor,
}

impl Analyzer {
    /// Creates an analyzer with its own CPU-backed model cache.
    pub fn new(config: AnalyzerConfig) -> Result<Self, DermaError> {
        Self::with_cache(config, Arc::new(ModelCache::new(Device::Cpu)))
    }

    /// Creates an analyzer sharing an existing model cache.
    pub fn with_cache(config: AnalyzerConfig, cache: Arc<ModelCache>) -> Result<Self, DermaError> {
        config.validate()?;
        let preprocessor = ImagePreprocessor::new(config.input_size);
        let compositor = HeatmapCompositor::new(config.overlay.clone());
        Ok(Self {
            config,
            cache,
            preprocessor,
            compositor,
        })
    }

    /// The configuration this analyzer runs with.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// The model cache backing this analyzer.
    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    /// Analyzes a lesion photograph. Never fails: when the classifier path
    /// breaks anywhere the degraded-mode analysis is returned instead.
    pub fn analyze(&self, image: &[u8]) -> AnalysisResult {
        match self.try_analyze(image) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "classifier path failed, using degraded analysis");
                fallback_analysis()
            }
        }
    }

    /// Classifier-backed analysis, surfacing failures to the caller.
    pub fn try_analyze(&self, image: &[u8]) -> Result<AnalysisResult, DermaError> {
        let probabilities = self.probabilities(image)?;
        AnalysisResult::from_class_scores(&probabilities)
    }

    /// The raw top-k class predictions for an image.
    pub fn predictions(&self, image: &[u8]) -> Result<Vec<Prediction>, DermaError> {
        let probabilities = self.probabilities(image)?;
        Ok(top_k(&probabilities, self.config.top_k))
    }

    /// Renders the attention heatmap overlay for an image. Never fails: a
    /// broken activation-map path degrades to the ellipse placeholder, and a
    /// broken placeholder path returns the original bytes untouched.
    pub fn heatmap(&self, image: &[u8]) -> HeatmapImage {
        match self.try_heatmap(image) {
            Ok(overlay) => overlay,
            Err(e) => {
                tracing::warn!(error = %e, "activation map unavailable, using placeholder");
                match self.compositor.placeholder(image) {
                    Ok(overlay) => overlay,
                    Err(e) => {
                        tracing::warn!(error = %e, "placeholder failed, passing image through");
                        self.compositor.passthrough(image)
                    }
                }
            }
        }
    }

    fn try_heatmap(&self, image: &[u8]) -> Result<HeatmapImage, DermaError> {
        let model = self.cache.get_or_load(&self.config.model_path)?;
        let input = self
            .preprocessor
            .prepare(image, self.cache.device())?;
        let probabilities = class_probabilities(&model, &input)?;
        let target = top_k(&probabilities, 1)
            .first()
            .map(|p| p.class_index)
            .ok_or_else(|| DermaError::explainability("model produced no class scores"))?;
        let cam = explain(&model, &input, target)?;
        self.compositor.compose(image, &cam)
    }

    /// Assembles the report for an already-computed analysis, consulting the
    /// collaborator when one is provided. Never fails.
    pub fn report(
        &self,
        analysis: &AnalysisResult,
        symptoms: &str,
        image: Option<(&[u8], &str)>,
        collaborator: Option<&dyn VisionCollaborator>,
    ) -> Report {
        assemble_report(collaborator, analysis, symptoms, image)
    }

    fn probabilities(&self, image: &[u8]) -> Result<Vec<f32>, DermaError> {
        let model = self.cache.get_or_load(&self.config.model_path)?;
        let input = self
            .preprocessor
            .prepare(image, self.cache.device())?;
        class_probabilities(&model, &input)
    }
}
