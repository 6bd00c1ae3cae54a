//! Configuration types and file loading for the analysis pipeline.
//!
//! Configuration can be loaded from TOML or JSON files, with the format
//! detected from the file extension.

use crate::core::errors::DermaError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_input_size() -> usize {
    224
}

fn default_top_k() -> usize {
    5
}

fn default_ellipse_margin() -> f32 {
    0.1
}

fn default_overlay_alpha() -> u8 {
    120
}

fn default_blur_divisor() -> f32 {
    20.0
}

/// Settings for the heatmap overlay and its placeholder path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Fractional margin of the placeholder ellipse bounding box
    /// (0.1 leaves the central 0.1..0.9 span covered).
    #[serde(default = "default_ellipse_margin")]
    pub ellipse_margin: f32,
    /// Alpha of the red overlay, 0..=255.
    #[serde(default = "default_overlay_alpha")]
    pub overlay_alpha: u8,
    /// Placeholder blur sigma is `min(width, height) / blur_divisor`.
    #[serde(default = "default_blur_divisor")]
    pub blur_divisor: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            ellipse_margin: default_ellipse_margin(),
            overlay_alpha: default_overlay_alpha(),
            blur_divisor: default_blur_divisor(),
        }
    }
}

/// Configuration for the [`Analyzer`](crate::pipeline::Analyzer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Path to the classifier model file (safetensors or PyTorch pickle).
    pub model_path: PathBuf,
    /// Side length of the square model input, in pixels.
    #[serde(default = "default_input_size")]
    pub input_size: usize,
    /// Number of top predictions returned by ranked inference.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Heatmap overlay settings.
    #[serde(default)]
    pub overlay: OverlayConfig,
}

impl AnalyzerConfig {
    /// Creates a configuration with defaults for everything but the model path.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            input_size: default_input_size(),
            top_k: default_top_k(),
            overlay: OverlayConfig::default(),
        }
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns a [`DermaError::ConfigError`] if any value is out of range.
    pub fn validate(&self) -> Result<(), DermaError> {
        if self.input_size == 0 {
            return Err(DermaError::config_error("input_size must be greater than 0"));
        }
        if self.top_k == 0 {
            return Err(DermaError::config_error("top_k must be greater than 0"));
        }
        if !(0.0..0.5).contains(&self.overlay.ellipse_margin) {
            return Err(DermaError::config_error(format!(
                "overlay.ellipse_margin must be in [0, 0.5), got {}",
                self.overlay.ellipse_margin
            )));
        }
        if self.overlay.blur_divisor <= 0.0 {
            return Err(DermaError::config_error(
                "overlay.blur_divisor must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Configuration file format.
#[derive(Debug, Clone, Copy)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Configuration loader for the analysis pipeline.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file, auto-detecting the format from the extension.
    pub fn load_from_file(path: &Path) -> Result<AnalyzerConfig, DermaError> {
        let format = ConfigFormat::from_extension(path).ok_or_else(|| DermaError::ConfigError {
            message: format!("Unsupported config file extension: {:?}", path.extension()),
        })?;

        let content = std::fs::read_to_string(path).map_err(|e| DermaError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        Self::load_from_string(&content, format)
    }

    /// Load configuration from a string with the specified format.
    pub fn load_from_string(
        content: &str,
        format: ConfigFormat,
    ) -> Result<AnalyzerConfig, DermaError> {
        let config = match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| DermaError::ConfigError {
                message: format!("Failed to parse TOML config: {e}"),
            })?,
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| DermaError::ConfigError {
                    message: format!("Failed to parse JSON config: {e}"),
                })?
            }
        };
        Ok(config)
    }
}
