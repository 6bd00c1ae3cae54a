//! Image preprocessing and overlay compositing.

pub mod heatmap;
pub mod preprocess;

pub use heatmap::{HeatmapCompositor, HeatmapImage};
pub use preprocess::{ImagePreprocessor, NORM_MEAN, NORM_STD};
