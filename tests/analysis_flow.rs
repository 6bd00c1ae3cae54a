//! End-to-end pipeline tests against a real checkpoint file on disk.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use candle_core::Device;
use derma_vision::core::config::AnalyzerConfig;
use derma_vision::models::{ModelCache, VARIANTS};
use derma_vision::pipeline::{Analyzer, FALLBACK_CONFIDENCE};
use image::{DynamicImage, Rgb, RgbImage};
use safetensors::tensor::TensorView;
use safetensors::Dtype;

/// Writes a metadata-tagged safetensors checkpoint for the smallest registry
/// variant with `num_classes` outputs.
fn write_checkpoint(path: &Path, num_classes: usize) {
    let variant = &VARIANTS[0];
    let manifest = variant.parameter_manifest(num_classes);

    // Deterministic non-zero parameters so inference and the activation map
    // produce non-degenerate values.
    let buffers: Vec<(String, Vec<usize>, Vec<u8>)> = manifest
        .into_iter()
        .map(|(name, shape)| {
            let count: usize = shape.iter().product();
            let bytes: Vec<u8> = (0..count)
                .flat_map(|i| (((i % 7) as f32) * 0.01 + 0.005).to_le_bytes())
                .collect();
            (name, shape, bytes)
        })
        .collect();
    let views: Vec<(&str, TensorView<'_>)> = buffers
        .iter()
        .map(|(name, shape, bytes)| {
            (
                name.as_str(),
                TensorView::new(Dtype::F32, shape.clone(), bytes).unwrap(),
            )
        })
        .collect();

    let metadata = HashMap::from([
        ("architecture".to_string(), variant.name.to_string()),
        ("num_classes".to_string(), num_classes.to_string()),
    ]);
    safetensors::serialize_to_file(views, &Some(metadata), path).unwrap();
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut cursor = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

#[test]
fn classifier_analysis_lands_on_the_simplex() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = dir.path().join("dermanet.safetensors");
    write_checkpoint(&checkpoint, 10);

    let analyzer = Analyzer::new(AnalyzerConfig::new(&checkpoint)).unwrap();
    let result = analyzer.try_analyze(&png_bytes(224, 224)).unwrap();

    assert!(result.tier1.is_simplex());
    assert!(result.tier2.is_simplex());
    assert_eq!(result.tier1.len(), 5);
    assert_eq!(result.tier2.len(), 10);
    assert!((0.0..=1.0).contains(&result.confidence));
    assert!(!result.description.is_empty());
}

#[test]
fn predictions_are_ranked_and_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = dir.path().join("dermanet.safetensors");
    write_checkpoint(&checkpoint, 10);

    let mut config = AnalyzerConfig::new(&checkpoint);
    config.top_k = 3;
    let analyzer = Analyzer::new(config).unwrap();
    let predictions = analyzer.predictions(&png_bytes(128, 128)).unwrap();

    assert_eq!(predictions.len(), 3);
    for pair in predictions.windows(2) {
        assert!(pair[0].probability >= pair[1].probability);
    }
}

#[test]
fn cached_model_survives_checkpoint_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = dir.path().join("dermanet.safetensors");
    write_checkpoint(&checkpoint, 10);

    let cache = Arc::new(ModelCache::new(Device::Cpu));
    let analyzer = Analyzer::with_cache(AnalyzerConfig::new(&checkpoint), cache).unwrap();

    analyzer.try_analyze(&png_bytes(96, 96)).unwrap();
    std::fs::remove_file(&checkpoint).unwrap();
    // A second run must not touch the filesystem again.
    analyzer.try_analyze(&png_bytes(96, 96)).unwrap();
}

#[test]
fn heatmap_overlay_keeps_original_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = dir.path().join("dermanet.safetensors");
    write_checkpoint(&checkpoint, 10);

    let analyzer = Analyzer::new(AnalyzerConfig::new(&checkpoint)).unwrap();
    let overlay = analyzer.heatmap(&png_bytes(160, 120));

    assert_eq!(overlay.mime, "image/jpeg");
    let decoded = image::load_from_memory(&overlay.bytes).unwrap();
    assert_eq!(decoded.width(), 160);
    assert_eq!(decoded.height(), 120);
}

#[test]
fn unmappable_class_count_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = dir.path().join("dermanet.safetensors");
    write_checkpoint(&checkpoint, 7);

    let analyzer = Analyzer::new(AnalyzerConfig::new(&checkpoint)).unwrap();
    assert!(analyzer.try_analyze(&png_bytes(64, 64)).is_err());

    let result = analyzer.analyze(&png_bytes(64, 64));
    assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
    assert!(result.tier2.is_simplex());
}

#[test]
fn missing_checkpoint_still_renders_a_placeholder_overlay() {
    let analyzer =
        Analyzer::new(AnalyzerConfig::new("/nonexistent/checkpoint.safetensors")).unwrap();
    let overlay = analyzer.heatmap(&png_bytes(80, 80));

    assert_eq!(overlay.mime, "image/jpeg");
    let decoded = image::load_from_memory(&overlay.bytes).unwrap();
    assert_eq!(decoded.width(), 80);
    assert_eq!(decoded.height(), 80);
}
