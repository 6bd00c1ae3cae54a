//! Image decoding and tensor preprocessing.

use crate::core::errors::{DermaError, ProcessingStage};
use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

/// Per-channel normalization means (RGB order).
pub const NORM_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Per-channel normalization standard deviations (RGB order).
pub const NORM_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Decodes images and turns them into normalized model input tensors.
///
/// The pipeline is decode, convert to RGB, bilinear resize to a square of
/// `input_size`, then channel-wise standardization into a `(1, 3, s, s)`
/// float tensor.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    input_size: usize,
}

impl ImagePreprocessor {
    /// Creates a preprocessor producing square inputs of `input_size`.
    pub fn new(input_size: usize) -> Self {
        Self { input_size }
    }

    /// Side length of the square model input.
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Decodes `bytes` into an RGB image, failing on unreadable input.
    pub fn decode(&self, bytes: &[u8]) -> Result<RgbImage, DermaError> {
        let image = image::load_from_memory(bytes)?;
        Ok(image.to_rgb8())
    }

    /// Produces the model input tensor for a decoded image.
    pub fn to_tensor(&self, image: &RgbImage, device: &Device) -> Result<Tensor, DermaError> {
        let size = self.input_size as u32;
        let resized = image::imageops::resize(image, size, size, FilterType::Triangle);

        // Channel-planar layout with y = (x - mean) / std folded into a
        // single multiply-add per sample.
        let pixels = self.input_size * self.input_size;
        let mut data = vec![0.0f32; 3 * pixels];
        for channel in 0..3 {
            let alpha = 1.0 / (255.0 * NORM_STD[channel]);
            let beta = -NORM_MEAN[channel] / NORM_STD[channel];
            let plane = &mut data[channel * pixels..(channel + 1) * pixels];
            for (i, pixel) in resized.pixels().enumerate() {
                plane[i] = f32::from(pixel.0[channel]) * alpha + beta;
            }
        }

        Tensor::from_vec(data, (1, 3, self.input_size, self.input_size), device).map_err(|e| {
            DermaError::processing(ProcessingStage::TensorOperation, "model input assembly", e)
        })
    }

    /// Decodes and preprocesses in one step.
    pub fn prepare(&self, bytes: &[u8], device: &Device) -> Result<Tensor, DermaError> {
        let image = self.decode(bytes)?;
        self.to_tensor(&image, device)
    }
}

/// Encodes an RGB image as JPEG.
pub(crate) fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, DermaError> {
    let mut bytes = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new(&mut bytes);
    DynamicImage::ImageRgb8(image.clone())
        .write_with_encoder(encoder)
        .map_err(|e| {
            DermaError::processing(ProcessingStage::Encoding, "jpeg encoding", e)
        })?;
    Ok(bytes)
}
