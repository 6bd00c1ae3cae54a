//! Error types for the skin-lesion analysis core.
//!
//! This module defines the error taxonomy used across the crate: model
//! reconstruction failures, inference failures, explainability failures,
//! processing errors, and report-parsing errors. Every public entry point
//! that must never fail (fallback analysis, heatmap compositing, report
//! assembly) catches these internally and degrades; the variants here are
//! what those recovery paths observe.

use thiserror::Error;

/// Enum representing different stages of processing in the analysis pipeline.
///
/// Used to identify which stage of the pipeline a processing error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred during tensor operations.
    TensorOperation,
    /// Error occurred during image normalization.
    Normalization,
    /// Error occurred during image resizing.
    Resize,
    /// Error occurred while compositing the heatmap overlay.
    Compositing,
    /// Error occurred while encoding an output image.
    Encoding,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::Normalization => write!(f, "normalization"),
            ProcessingStage::Resize => write!(f, "resize"),
            ProcessingStage::Compositing => write!(f, "compositing"),
            ProcessingStage::Encoding => write!(f, "encoding"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Errors that can occur in the skin-lesion analysis core.
///
/// The variants mirror the recovery contract of the pipeline:
/// * [`DermaError::ModelLoad`] is fatal to the load call; callers route to
///   the synthetic fallback analysis.
/// * [`DermaError::Inference`] is fatal to the inference call, same recovery.
/// * [`DermaError::Explainability`] is always caught by callers and replaced
///   with the placeholder overlay path; it never aborts the primary analysis.
/// * [`DermaError::ReportParse`] is recovered by local report synthesis and
///   never surfaces to the consumer.
#[derive(Error, Debug)]
pub enum DermaError {
    /// Error occurred while decoding or loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// No inference-ready model could be reconstructed from the file.
    #[error("model load ({path}): {message}")]
    ModelLoad {
        /// Path of the model file that failed to load.
        path: String,
        /// Description of the failure.
        message: String,
    },

    /// Runtime failure during a forward or backward pass.
    #[error("inference: {context}")]
    Inference {
        /// What the pass was doing when it failed.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Grad-CAM was unable to produce a class activation map.
    #[error("explainability: {message}")]
    Explainability {
        /// Why no CAM could be computed.
        message: String,
    },

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// A collaborator reply contained no parseable JSON object.
    #[error("report parse: {message}")]
    ReportParse {
        /// Why the reply could not be parsed.
        message: String,
    },

    /// Every strategy in an ordered-fallback chain failed.
    #[error("all {what} attempts failed: {summary}")]
    AttemptsExhausted {
        /// What the chain was trying to achieve.
        what: String,
        /// One-line summary of each strategy's failure, in order.
        summary: String,
    },

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl DermaError {
    /// Creates a model-load error for the given path.
    pub fn model_load(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Creates an inference error with context.
    pub fn inference(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an explainability error.
    pub fn explainability(message: impl Into<String>) -> Self {
        Self::Explainability {
            message: message.into(),
        }
    }

    /// Creates a processing error for tensor operations.
    pub fn tensor_operation(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind: ProcessingStage::TensorOperation,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates a processing error for a specific stage.
    pub fn processing(
        kind: ProcessingStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates a report-parse error.
    pub fn report_parse(message: impl Into<String>) -> Self {
        Self::ReportParse {
            message: message.into(),
        }
    }
}

impl From<image::ImageError> for DermaError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

/// Result alias used throughout the crate.
pub type DermaResult<T> = Result<T, DermaError>;
